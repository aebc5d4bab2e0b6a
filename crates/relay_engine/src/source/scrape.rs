use chrono::{DateTime, Utc};
use relay_core::{Observation, UNSET_COORDINATE};
use serde_json::Value;

use super::{parse_numeric, truncate, ObservationSource, ParseError};
use crate::SourceMode;

const START_MARKER: &str = "\"current_observation\":";
const END_MARKER: &str = "\"astronomy\"";

const INHG_TO_MILLIBARS: f64 = 33.86389;

/// Reads the JSON observation embedded in the station dashboard page.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScrapeSource;

impl ObservationSource for ScrapeSource {
    fn mode(&self) -> SourceMode {
        SourceMode::Scrape
    }

    fn parse(&self, body: &str, baro_offset_millibars: i32) -> Result<Observation, ParseError> {
        let json = extract_observation_json(body)?;
        let data: Value =
            serde_json::from_str(json).map_err(|err| ParseError::InvalidJson(err.to_string()))?;
        if !data.is_object() {
            return Err(ParseError::InvalidJson("observation is not an object".into()));
        }

        let observed_at = number(&data, "/date/epoch", "date.epoch")?.trunc() as i64;
        let pretty_time = data
            .pointer("/date/pretty")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| utc_pretty(observed_at));
        let pressure_in = number(&data, "/pressure", "pressure")?;

        Ok(Observation {
            observed_at,
            pretty_time,
            wind_direction_deg: truncate(number(&data, "/wind_dir_degrees", "wind_dir_degrees")?),
            wind_speed_mph: truncate(number(&data, "/wind_speed", "wind_speed")?),
            wind_gust_mph: truncate(number(&data, "/wind_gust_speed", "wind_gust_speed")?),
            temperature_f: truncate(number(&data, "/temperature", "temperature")?),
            humidity_pct: truncate(number(&data, "/humidity", "humidity")?),
            pressure_millibars: pressure_in * INHG_TO_MILLIBARS - f64::from(baro_offset_millibars),
            precip_1hr_in: number(&data, "/precip_1hr", "precip_1hr")?,
            precip_today_in: number(&data, "/precip_today", "precip_today")?,
            station_lat: optional_number(&data, "/station/latitude").unwrap_or(UNSET_COORDINATE),
            station_lng: optional_number(&data, "/station/longitude").unwrap_or(UNSET_COORDINATE),
        })
    }
}

/// Slices the `current_observation` object out of the dashboard page.
///
/// The object must start right after the `"current_observation":` marker and
/// close before the next `"astronomy"` marker. The closing brace is found by
/// a depth scan that skips string contents.
pub fn extract_observation_json(page: &str) -> Result<&str, ParseError> {
    let start = page
        .find(START_MARKER)
        .ok_or(ParseError::MarkerNotFound("current_observation"))?
        + START_MARKER.len();
    let rest = &page[start..];
    let end = rest
        .find(END_MARKER)
        .ok_or(ParseError::MarkerNotFound("astronomy"))?;
    let window = &rest[..end];

    let open = window
        .find(|c: char| !c.is_whitespace())
        .filter(|&idx| window[idx..].starts_with('{'))
        .ok_or_else(|| ParseError::InvalidJson("current_observation is not an object".into()))?;
    let close = matching_brace(&window[open..]).ok_or_else(|| {
        ParseError::InvalidJson("current_observation is not closed before astronomy".into())
    })?;
    Ok(&window[open..=open + close])
}

fn matching_brace(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, byte) in text.bytes().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_numeric(s),
        _ => None,
    }
}

fn optional_number(data: &Value, pointer: &str) -> Option<f64> {
    data.pointer(pointer).and_then(as_number)
}

fn number(data: &Value, pointer: &str, name: &'static str) -> Result<f64, ParseError> {
    optional_number(data, pointer).ok_or(ParseError::MissingField(name))
}

fn utc_pretty(epoch: i64) -> String {
    DateTime::<Utc>::from_timestamp(epoch, 0)
        .map(|at| at.format("%B %-d, %Y %H:%M UTC").to_string())
        .unwrap_or_else(|| epoch.to_string())
}
