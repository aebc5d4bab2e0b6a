use std::sync::Arc;

use chrono::{DateTime, Utc};
use relay_core::{
    content_check, freshness, ContentCheck, EncodeError, Freshness, Packet, PacketEncoder,
    StationConfig,
};
use relay_logging::{relay_debug, relay_error, relay_info};
use thiserror::Error;

use crate::decode::{decode_body, DecodeError};
use crate::fetch::Fetcher;
use crate::persist::{ensure_output_dir, PersistError, StationStore};
use crate::source::{source_for, ParseError};
use crate::upload::{DeliveryError, Uploader};
use crate::{FetchError, SourceMode};

/// Per-invocation switches that are not part of the station itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub mode: SourceMode,
    /// Send even when the observation is not newer than the last one.
    pub force: bool,
    pub log_packets: bool,
    pub log_observations: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            mode: SourceMode::Scrape,
            force: false,
            log_packets: true,
            log_observations: true,
        }
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    /// The observation is not newer than the last accepted one.
    NoNewData {
        observed_at: i64,
        last_observed_at: i64,
        pretty_time: String,
    },
    /// Duplicate sends are disabled and the fields match the last packet.
    NoChange { observed_at: i64, pretty_time: String },
    /// A send was attempted. `delivery` carries its result.
    Transmitted {
        packet: Packet,
        delivery: Result<usize, DeliveryError>,
    },
}

/// Failures that end a run before anything is sent.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Fetch, gate, encode and send one observation for one station.
pub struct Relay<F, U> {
    fetcher: F,
    uploader: U,
    encoder: PacketEncoder,
    clock: Clock,
}

impl<F: Fetcher, U: Uploader> Relay<F, U> {
    pub fn new(fetcher: F, uploader: U) -> Self {
        Self {
            fetcher,
            uploader,
            encoder: PacketEncoder::new(),
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_encoder(mut self, encoder: PacketEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    /// Clock used for the transmit time in the observation log.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub async fn run(
        &self,
        config: &StationConfig,
        options: &RunOptions,
    ) -> Result<RunOutcome, RelayError> {
        let store = StationStore::new(config.work_directory.clone());
        ensure_output_dir(store.dir())?;

        let fetched = self.fetcher.fetch(&config.pws_id, options.mode).await?;
        let body = decode_body(&fetched.bytes, fetched.metadata.content_type.as_deref())?;
        relay_debug!("Decoded {} body as {}", options.mode, body.encoding_label);
        let obs = source_for(options.mode).parse(&body.text, config.baro_offset_millibars)?;

        let last_observed_at = store.last_observed_at(&config.pws_id)?;
        match freshness(last_observed_at, obs.observed_at, options.force) {
            Freshness::Stale { last_observed_at } => {
                relay_info!(
                    "No new observation data since {} (ts: {} <= {})",
                    obs.pretty_time,
                    obs.observed_at,
                    last_observed_at
                );
                return Ok(RunOutcome::NoNewData {
                    observed_at: obs.observed_at,
                    last_observed_at,
                    pretty_time: obs.pretty_time,
                });
            }
            Freshness::Forced { last_observed_at } => {
                relay_info!(
                    "Forcing send of observation {} (last sent {})",
                    obs.observed_at,
                    last_observed_at
                );
            }
            Freshness::New => {}
        }

        let packet = self.encoder.encode(config, &obs)?;
        relay_info!("New observation: {} ({})", obs.pretty_time, obs.observed_at);
        // Recorded before sending: a failed send is not retried for this observation.
        store.record_observed_at(&config.pws_id, obs.observed_at)?;

        relay_info!(
            "wind: dir {}° speed {}mph gust {}mph temp: {}°f hum: {}% baro: {:.2}mb rain: 1hr {}in today {}in",
            obs.wind_direction_deg,
            obs.wind_speed_mph,
            obs.wind_gust_mph,
            obs.temperature_f,
            obs.humidity_pct,
            obs.pressure_millibars,
            obs.precip_1hr_in,
            obs.precip_today_in
        );

        if !config.flags.allow_duplicate_sends {
            let fields = packet.field_encoding();
            let previous = store.last_encoded_fields(&config.cwop_id)?;
            if content_check(previous.as_deref(), &fields) == ContentCheck::Unchanged {
                relay_info!("Observation data unchanged since {}", obs.pretty_time);
                return Ok(RunOutcome::NoChange {
                    observed_at: obs.observed_at,
                    pretty_time: obs.pretty_time,
                });
            }
            store.record_encoded_fields(&config.cwop_id, &fields)?;
        }

        relay_info!("{}", packet.text);
        let delivery = self.uploader.upload(&config.cwop_id, &packet.text).await;
        if let Err(err) = &delivery {
            relay_debug!("Delivery to APRS-IS failed: {}", err);
        }

        // The packet is already on the wire (or lost); a log write failure
        // must not replace the delivery result.
        if options.log_packets {
            if let Err(err) = store.append_packet(&config.cwop_id, &packet.text) {
                relay_error!("Cannot append packet log for {}: {}", config.cwop_id, err);
            }
        }
        if options.log_observations {
            if let Err(err) =
                store.append_observation(&config.cwop_id, (self.clock)(), &packet.tokens)
            {
                relay_error!("Cannot append observation log for {}: {}", config.cwop_id, err);
            }
        }

        Ok(RunOutcome::Transmitted { packet, delivery })
    }
}
