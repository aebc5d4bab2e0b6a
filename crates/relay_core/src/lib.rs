//! Relay core: station configuration, canonical observations and the pure
//! CWOP packet encoding and staleness rules. No IO happens in this crate.
mod config;
mod encode;
mod gate;
mod observation;
mod platform;

pub use config::{
    default_comment, ConfigError, SendFlags, StationConfig, StationConfigBuilder,
};
pub use encode::{encode_latlong, EncodeError, Packet, PacketEncoder, WeatherTokens};
pub use gate::{content_check, freshness, ContentCheck, Freshness};
pub use observation::{is_valid_latitude, is_valid_longitude, Observation, UNSET_COORDINATE};
pub use platform::{os_code, os_code_for};
