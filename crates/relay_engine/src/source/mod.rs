//! Upstream observation formats. Each source maps its own schema onto the
//! canonical [`Observation`]; everything after parsing is shared.
mod feed;
mod scrape;

use relay_core::Observation;
use thiserror::Error;

use crate::SourceMode;

pub use feed::FeedSource;
pub use scrape::{extract_observation_json, ScrapeSource};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("cannot find {0} marker in station page")]
    MarkerNotFound(&'static str),
    #[error("embedded observation is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("observation feed is not valid XML: {0}")]
    InvalidXml(String),
    #[error("observation field {0} is missing or not numeric")]
    MissingField(&'static str),
    #[error("cannot parse observation time {0:?}")]
    InvalidTimestamp(String),
}

pub trait ObservationSource: Send + Sync {
    fn mode(&self) -> SourceMode;

    /// Parses a decoded upstream body. `baro_offset_millibars` is subtracted
    /// from the reported pressure.
    fn parse(&self, body: &str, baro_offset_millibars: i32) -> Result<Observation, ParseError>;
}

pub fn source_for(mode: SourceMode) -> Box<dyn ObservationSource> {
    match mode {
        SourceMode::Scrape => Box::new(ScrapeSource),
        SourceMode::Feed => Box::new(FeedSource),
    }
}

/// Lenient numeric text: surrounding whitespace and a trailing `%` are allowed.
pub(crate) fn parse_numeric(text: &str) -> Option<f64> {
    let text = text.trim();
    let text = text.strip_suffix('%').unwrap_or(text).trim_end();
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Truncates toward zero, saturating at the `i32` bounds.
pub(crate) fn truncate(value: f64) -> i32 {
    value.trunc() as i32
}
