use chrono::{DateTime, Utc};

/// Sentinel for a coordinate the upstream did not report. Lies outside both
/// the latitude and the longitude range.
pub const UNSET_COORDINATE: f64 = 999.0;

pub fn is_valid_latitude(value: f64) -> bool {
    value.is_finite() && value.abs() <= 90.0
}

pub fn is_valid_longitude(value: f64) -> bool {
    value.is_finite() && value.abs() <= 180.0
}

/// One station snapshot, normalized from either upstream format.
///
/// Integer fields are truncated from the upstream values; wind values may be
/// negative when the station reports them as invalid. Pressure already has
/// the station's barometer offset applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub observed_at: i64,
    pub pretty_time: String,
    pub wind_direction_deg: i32,
    pub wind_speed_mph: i32,
    pub wind_gust_mph: i32,
    pub temperature_f: i32,
    pub humidity_pct: i32,
    pub pressure_millibars: f64,
    pub precip_1hr_in: f64,
    pub precip_today_in: f64,
    pub station_lat: f64,
    pub station_lng: f64,
}

impl Observation {
    pub fn observed_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp(self.observed_at, 0)
    }
}
