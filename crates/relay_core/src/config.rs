use std::path::PathBuf;

use relay_logging::relay_warn;
use thiserror::Error;

use crate::observation::{is_valid_latitude, is_valid_longitude};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("CWOP station id not set, use -c <station-id>")]
    MissingCwopId,
    #[error("PWS station id not set, use -p <station-id>")]
    MissingPwsId,
}

/// Which optional blocks go into the packet, and whether an unchanged
/// observation may be sent twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendFlags {
    pub send_wind: bool,
    pub send_rain: bool,
    pub allow_duplicate_sends: bool,
}

impl Default for SendFlags {
    fn default() -> Self {
        Self {
            send_wind: true,
            send_rain: true,
            allow_duplicate_sends: true,
        }
    }
}

/// Everything known about the station for one run. Built once and then only
/// borrowed.
#[derive(Debug, Clone, PartialEq)]
pub struct StationConfig {
    pub cwop_id: String,
    pub pws_id: String,
    pub baro_offset_millibars: i32,
    pub fixed_lat: Option<f64>,
    pub fixed_lng: Option<f64>,
    pub fixed_latlong: Option<String>,
    pub comment: String,
    pub flags: SendFlags,
    pub work_directory: PathBuf,
}

impl StationConfig {
    pub fn builder(cwop_id: impl Into<String>, pws_id: impl Into<String>) -> StationConfigBuilder {
        StationConfigBuilder::new(cwop_id, pws_id)
    }
}

pub fn default_comment(pws_id: &str) -> String {
    format!("cwop-relay Weather Underground ({pws_id}) to CWOP relay")
}

#[derive(Debug, Clone, Default)]
pub struct StationConfigBuilder {
    cwop_id: String,
    pws_id: String,
    baro_offset_millibars: i32,
    lat: Option<f64>,
    lng: Option<f64>,
    latlong: Option<String>,
    comment: Option<String>,
    flags: SendFlags,
    work_directory: Option<PathBuf>,
}

impl StationConfigBuilder {
    pub fn new(cwop_id: impl Into<String>, pws_id: impl Into<String>) -> Self {
        Self {
            cwop_id: cwop_id.into(),
            pws_id: pws_id.into(),
            ..Self::default()
        }
    }

    pub fn baro_offset(mut self, millibars: i32) -> Self {
        self.baro_offset_millibars = millibars;
        self
    }

    pub fn latitude(mut self, lat: f64) -> Self {
        self.lat = Some(lat);
        self
    }

    pub fn longitude(mut self, lng: f64) -> Self {
        self.lng = Some(lng);
        self
    }

    pub fn latlong(mut self, latlong: impl Into<String>) -> Self {
        self.latlong = Some(latlong.into());
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn flags(mut self, flags: SendFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn work_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_directory = Some(dir.into());
        self
    }

    /// Validates identifiers and coordinates. Out-of-range coordinates are
    /// dropped with a warning rather than failing the run.
    pub fn build(self) -> Result<StationConfig, ConfigError> {
        let cwop_id = self.cwop_id.trim().to_string();
        if cwop_id.is_empty() {
            return Err(ConfigError::MissingCwopId);
        }
        let pws_id = self.pws_id.trim().to_string();
        if pws_id.is_empty() {
            return Err(ConfigError::MissingPwsId);
        }

        let fixed_lat = self.lat.filter(|lat| {
            let valid = is_valid_latitude(*lat);
            if !valid {
                relay_warn!("Invalid latitude {} specified, ignoring it", lat);
            }
            valid
        });
        let fixed_lng = self.lng.filter(|lng| {
            let valid = is_valid_longitude(*lng);
            if !valid {
                relay_warn!("Invalid longitude {} specified, ignoring it", lng);
            }
            valid
        });

        let fixed_latlong = self
            .latlong
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let comment = self
            .comment
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| default_comment(&pws_id));

        Ok(StationConfig {
            cwop_id,
            pws_id,
            baro_offset_millibars: self.baro_offset_millibars,
            fixed_lat,
            fixed_lng,
            fixed_latlong,
            comment,
            flags: self.flags,
            work_directory: self.work_directory.unwrap_or_else(std::env::temp_dir),
        })
    }
}
