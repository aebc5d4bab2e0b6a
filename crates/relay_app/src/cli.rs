use std::path::PathBuf;

use clap::Parser;
use relay_core::{ConfigError, SendFlags, StationConfig};
use relay_engine::{RunOptions, SourceMode};

/// Relay a Weather Underground personal weather station observation to CWOP.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "cwop-relay", version, about)]
pub struct Cli {
    /// CWOP station id, e.g. EW1234 or KH6XX-1
    #[arg(short = 'c', long = "cwop-id", aliases = ["cwop_id", "cwopid"], env = "CWOP_ID")]
    pub cwop_id: Option<String>,

    /// Weather Underground PWS id, e.g. KHIHONOL12
    #[arg(short = 'p', long = "pws-id", aliases = ["pws_id", "pwsid"], env = "PWS_ID")]
    pub pws_id: Option<String>,

    /// Mail fatal errors and failed deliveries to this address
    #[arg(short = 'e', long = "errors", aliases = ["email", "e-mail"], value_name = "ADDR")]
    pub errors: Option<String>,

    /// Send even if the observation is not newer than the last one sent
    #[arg(short = 'f', long)]
    pub force: bool,

    /// Preformatted position, e.g. 2118.00N/15748.00W
    #[arg(short = 'l', long, alias = "lat_long", value_name = "STRING")]
    pub latlong: Option<String>,

    /// Station latitude in decimal degrees
    #[arg(long, alias = "latitude", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Station longitude in decimal degrees
    #[arg(long, aliases = ["lon", "long", "longitude"], allow_negative_numbers = true)]
    pub lng: Option<f64>,

    /// Millibars subtracted from the reported pressure
    #[arg(short = 'o', long, value_name = "MB", default_value_t = 0, allow_negative_numbers = true)]
    pub offset: i32,

    /// Packet comment
    #[arg(short = 'm', long)]
    pub comment: Option<String>,

    /// Send `.../...g...` instead of wind data
    #[arg(short = 'n', long = "no-wind", aliases = ["nowind", "no_wind"])]
    pub no_wind: bool,

    /// Leave rain out of the packet
    #[arg(short = 'r', long = "no-rain", aliases = ["norain", "no_rain"])]
    pub no_rain: bool,

    /// Do not send an observation whose fields match the last packet
    #[arg(short = 'd', long = "no-dups", aliases = ["nodups", "no_dups"])]
    pub no_dups: bool,

    /// Directory for state and log files [default: system temp dir]
    #[arg(short = 'w', long = "workdir", alias = "work")]
    pub workdir: Option<PathBuf>,

    /// Report each step on stdout
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Read the XML feed instead of the station dashboard
    #[arg(short = 'x', long)]
    pub xml: bool,

    /// Append to the observation log (on unless --no-save)
    #[arg(short = 's', long)]
    pub save: bool,

    /// Do not append to the observation log
    #[arg(long = "no-save", conflicts_with = "save")]
    pub no_save: bool,

    /// Append to the packet log (on unless --no-packet-log)
    #[arg(short = 't', long)]
    pub packet: bool,

    /// Do not append to the packet log
    #[arg(long = "no-packet-log", conflicts_with = "packet")]
    pub no_packet_log: bool,

    /// Also write log output to this file
    #[arg(long = "log-file", value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub fn station_config(&self) -> Result<StationConfig, ConfigError> {
        let mut builder = StationConfig::builder(
            self.cwop_id.clone().unwrap_or_default(),
            self.pws_id.clone().unwrap_or_default(),
        )
        .baro_offset(self.offset)
        .flags(SendFlags {
            send_wind: !self.no_wind,
            send_rain: !self.no_rain,
            allow_duplicate_sends: !self.no_dups,
        });
        if let Some(lat) = self.lat {
            builder = builder.latitude(lat);
        }
        if let Some(lng) = self.lng {
            builder = builder.longitude(lng);
        }
        if let Some(latlong) = &self.latlong {
            builder = builder.latlong(latlong.as_str());
        }
        if let Some(comment) = &self.comment {
            builder = builder.comment(comment.as_str());
        }
        if let Some(dir) = &self.workdir {
            builder = builder.work_directory(dir.as_path());
        }
        builder.build()
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            mode: if self.xml {
                SourceMode::Feed
            } else {
                SourceMode::Scrape
            },
            force: self.force,
            log_packets: self.packet || !self.no_packet_log,
            log_observations: self.save || !self.no_save,
        }
    }
}
