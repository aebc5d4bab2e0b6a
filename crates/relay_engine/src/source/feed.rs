use chrono::DateTime;
use relay_core::{Observation, UNSET_COORDINATE};
use serde::Deserialize;

use super::{parse_numeric, truncate, ObservationSource, ParseError};
use crate::SourceMode;

/// Reads the XML current-observation feed.
#[derive(Debug, Default, Clone, Copy)]
pub struct FeedSource;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CurrentObservation {
    observation_time_rfc822: Option<String>,
    wind_degrees: Option<String>,
    wind_mph: Option<String>,
    wind_gust_mph: Option<String>,
    temp_f: Option<String>,
    relative_humidity: Option<String>,
    pressure_mb: Option<String>,
    precip_1hr_in: Option<String>,
    precip_today_in: Option<String>,
    location: Option<Location>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Location {
    latitude: Option<String>,
    longitude: Option<String>,
}

fn number(value: &Option<String>, name: &'static str) -> Result<f64, ParseError> {
    value
        .as_deref()
        .and_then(parse_numeric)
        .ok_or(ParseError::MissingField(name))
}

impl ObservationSource for FeedSource {
    fn mode(&self) -> SourceMode {
        SourceMode::Feed
    }

    fn parse(&self, body: &str, baro_offset_millibars: i32) -> Result<Observation, ParseError> {
        let data: CurrentObservation =
            quick_xml::de::from_str(body).map_err(|err| ParseError::InvalidXml(err.to_string()))?;

        let pretty_time = data
            .observation_time_rfc822
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ParseError::MissingField("observation_time_rfc822"))?
            .to_string();
        let observed_at = DateTime::parse_from_rfc2822(&pretty_time)
            .map_err(|_| ParseError::InvalidTimestamp(pretty_time.clone()))?
            .timestamp();

        let (station_lat, station_lng) = data
            .location
            .as_ref()
            .map(|loc| {
                (
                    loc.latitude.as_deref().and_then(parse_numeric),
                    loc.longitude.as_deref().and_then(parse_numeric),
                )
            })
            .unwrap_or((None, None));

        Ok(Observation {
            observed_at,
            pretty_time,
            wind_direction_deg: truncate(number(&data.wind_degrees, "wind_degrees")?),
            wind_speed_mph: truncate(number(&data.wind_mph, "wind_mph")?),
            wind_gust_mph: truncate(number(&data.wind_gust_mph, "wind_gust_mph")?),
            temperature_f: truncate(number(&data.temp_f, "temp_f")?),
            humidity_pct: truncate(number(&data.relative_humidity, "relative_humidity")?),
            pressure_millibars: number(&data.pressure_mb, "pressure_mb")?
                - f64::from(baro_offset_millibars),
            precip_1hr_in: number(&data.precip_1hr_in, "precip_1hr_in")?,
            precip_today_in: number(&data.precip_today_in, "precip_today_in")?,
            station_lat: station_lat.unwrap_or(UNSET_COORDINATE),
            station_lng: station_lng.unwrap_or(UNSET_COORDINATE),
        })
    }
}
