//! Relay engine: the IO side of a run. Fetches the upstream observation,
//! parses it, consults the persisted gate state and delivers the packet.
mod decode;
mod fetch;
mod persist;
mod relay;
mod source;
mod types;
mod upload;

pub use decode::{decode_body, DecodeError, DecodedBody};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher, DASHBOARD_URL, FEED_URL};
pub use persist::{ensure_output_dir, state_filename, AtomicFileWriter, PersistError, StationStore};
pub use relay::{Relay, RelayError, RunOptions, RunOutcome};
pub use source::{
    extract_observation_json, source_for, FeedSource, ObservationSource, ParseError,
    ScrapeSource,
};
pub use types::{FailureKind, FetchError, FetchMetadata, FetchOutput, SourceMode};
pub use upload::{
    login_line, session_payload, AprsIsUploader, DeliveryError, UploadSettings, Uploader,
    APRS_IS_HOST, APRS_IS_PORT,
};
