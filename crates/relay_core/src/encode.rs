use thiserror::Error;

use crate::config::{SendFlags, StationConfig};
use crate::observation::{is_valid_latitude, is_valid_longitude, Observation};
use crate::platform::os_code;

// Absorbs binary representation error before truncating, so 0.29 in
// becomes 29 hundredths and not 28.
const SCALE_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("station position unavailable (lat {lat}, lng {lng})")]
    PositionUnavailable { lat: f64, lng: f64 },
    #[error("observation timestamp {0} is out of range")]
    InvalidTimestamp(i64),
}

/// The fixed-width weather tokens, in packet order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherTokens {
    pub wind_direction: String,
    pub wind_speed: String,
    pub wind_gust: String,
    pub temperature: String,
    pub rain_hour: String,
    pub rain_today: String,
    pub humidity: String,
    pub barometer: String,
}

impl WeatherTokens {
    pub fn encode(flags: &SendFlags, obs: &Observation) -> Self {
        let (wind_direction, wind_speed, wind_gust) = if flags.send_wind {
            (
                format!("_{:03}", obs.wind_direction_deg.max(0)),
                format!("/{:03}", obs.wind_speed_mph.max(0)),
                format!("g{:03}", obs.wind_gust_mph.max(0)),
            )
        } else {
            ("_...".to_string(), "/...".to_string(), "g...".to_string())
        };

        let (rain_hour, rain_today) = if flags.send_rain {
            (
                rain_token('r', obs.precip_1hr_in),
                rain_token('P', obs.precip_today_in),
            )
        } else {
            (String::new(), String::new())
        };

        Self {
            wind_direction,
            wind_speed,
            wind_gust,
            temperature: temperature_token(obs.temperature_f),
            rain_hour,
            rain_today,
            humidity: humidity_token(obs.humidity_pct),
            barometer: barometer_token(obs.pressure_millibars),
        }
    }

    pub fn as_array(&self) -> [&str; 8] {
        [
            self.wind_direction.as_str(),
            self.wind_speed.as_str(),
            self.wind_gust.as_str(),
            self.temperature.as_str(),
            self.rain_hour.as_str(),
            self.rain_today.as_str(),
            self.humidity.as_str(),
            self.barometer.as_str(),
        ]
    }

    /// Concatenation used by the duplicate-content gate. Excludes header,
    /// position, platform tag and comment.
    pub fn field_encoding(&self) -> String {
        self.as_array().concat()
    }
}

fn temperature_token(fahrenheit: i32) -> String {
    // Sign takes one of the three characters: -5 => "t-05".
    format!("t{:03}", fahrenheit.clamp(-99, 999))
}

fn rain_token(prefix: char, inches: f64) -> String {
    if inches < 0.0 {
        return format!("{prefix}000");
    }
    format!("{prefix}{:03}", scaled(inches, 100.0).min(999))
}

fn humidity_token(percent: i32) -> String {
    match percent.clamp(0, 100) {
        100 => "h00".to_string(),
        p => format!("h{p:02}"),
    }
}

fn barometer_token(millibars: f64) -> String {
    format!("b{:05}", scaled(millibars, 10.0).clamp(0, 99_999))
}

fn scaled(value: f64, factor: f64) -> i64 {
    (value * factor + SCALE_EPSILON).trunc() as i64
}

/// `DDMM.MMh/DDDMM.MMh`, minutes floored to hundredths.
pub fn encode_latlong(lat: f64, lng: f64) -> String {
    let (lat_deg, lat_min, ns) = degrees_minutes(lat, 'N', 'S');
    let (lng_deg, lng_min, ew) = degrees_minutes(lng, 'E', 'W');
    format!(
        "{lat_deg:02}{:02}.{:02}{ns}/{lng_deg:03}{:02}.{:02}{ew}",
        lat_min / 100,
        lat_min % 100,
        lng_min / 100,
        lng_min % 100
    )
}

/// Whole degrees and minutes in hundredths, always below `6000`.
fn degrees_minutes(value: f64, positive: char, negative: char) -> (u32, u32, char) {
    let hemisphere = if value < 0.0 { negative } else { positive };
    let value = value.abs();
    let mut degrees = value.trunc() as u32;
    let mut hundredths = ((value.fract() * 6000.0) + SCALE_EPSILON).floor() as u32;
    if hundredths >= 6000 {
        degrees += 1;
        hundredths -= 6000;
    }
    (degrees, hundredths, hemisphere)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub text: String,
    pub position: String,
    pub tokens: WeatherTokens,
}

impl Packet {
    pub fn field_encoding(&self) -> String {
        self.tokens.field_encoding()
    }
}

/// Renders an observation into the CWOP/APRS weather packet.
#[derive(Debug, Clone, Copy)]
pub struct PacketEncoder {
    os_code: char,
}

impl Default for PacketEncoder {
    fn default() -> Self {
        Self { os_code: os_code() }
    }
}

impl PacketEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_os_code(os_code: char) -> Self {
        Self { os_code }
    }

    pub fn encode(&self, config: &StationConfig, obs: &Observation) -> Result<Packet, EncodeError> {
        let position = resolve_position(config, obs)?;
        let tokens = WeatherTokens::encode(&config.flags, obs);
        let stamp = obs
            .observed_at_utc()
            .ok_or(EncodeError::InvalidTimestamp(obs.observed_at))?
            .format("%d%H%M");

        let text = format!(
            "{}>APRS,TCPIP*:@{}z{}{}{}W2C {}",
            config.cwop_id,
            stamp,
            position,
            tokens.field_encoding(),
            self.os_code,
            config.comment
        );

        Ok(Packet {
            text,
            position,
            tokens,
        })
    }
}

fn resolve_position(config: &StationConfig, obs: &Observation) -> Result<String, EncodeError> {
    if let Some(fixed) = &config.fixed_latlong {
        return Ok(fixed.clone());
    }
    let lat = config.fixed_lat.unwrap_or(obs.station_lat);
    let lng = config.fixed_lng.unwrap_or(obs.station_lng);
    if !is_valid_latitude(lat) || !is_valid_longitude(lng) {
        return Err(EncodeError::PositionUnavailable { lat, lng });
    }
    Ok(encode_latlong(lat, lng))
}
