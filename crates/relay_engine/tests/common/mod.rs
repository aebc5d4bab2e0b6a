#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use relay_core::{SendFlags, StationConfig};
use relay_engine::{FetchSettings, UploadSettings};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const CWOP_ID: &str = "KH6XX-1";
pub const PWS_ID: &str = "KHIHONOL12";

/// 2023-11-14 22:13:20 UTC
pub const OBSERVED_AT: i64 = 1_700_000_000;

pub fn dashboard_page(epoch: i64) -> String {
    format!(
        r#"<!DOCTYPE html><html><head><title>Station</title>
<script>window.__data={{"units":{{"label":"}}{{"}},"current_observation":{{"station":{{"id":"KHIHONOL12","latitude":21.3,"longitude":-157.8}},"date":{{"epoch":{epoch},"pretty":"1:13 PM HST on November 14, 2023"}},"temperature":72.4,"humidity":"45","wind_dir_degrees":270,"wind_speed":8.9,"wind_gust_speed":14,"pressure":29.92,"precip_1hr":0.05,"precip_today":0.42,"conditions":"{{cloudy}}"}},"astronomy":{{"sunrise":"6:41 AM"}}}};</script>
</head><body><div id="app"></div></body></html>"#
    )
}

pub const FEED_XML: &str = r#"<?xml version="1.0"?>
<current_observation>
  <credit>Weather Underground Personal Weather Station</credit>
  <location>
    <full>Honolulu, HI</full>
    <city>Honolulu</city>
    <latitude>21.300000</latitude>
    <longitude>-157.800000</longitude>
    <elevation>15 ft</elevation>
  </location>
  <station_id>KHIHONOL12</station_id>
  <observation_time>Last Updated on November 14, 12:13 PM HST</observation_time>
  <observation_time_rfc822>Tue, 14 Nov 2023 22:13:20 GMT</observation_time_rfc822>
  <temp_f>72.4</temp_f>
  <relative_humidity>45</relative_humidity>
  <wind_degrees>270</wind_degrees>
  <wind_mph>8.9</wind_mph>
  <wind_gust_mph>14.0</wind_gust_mph>
  <pressure_mb>1013.2</pressure_mb>
  <precip_1hr_in>0.05</precip_1hr_in>
  <precip_today_in>0.42</precip_today_in>
</current_observation>
"#;

pub fn station_config(work_dir: &Path, flags: SendFlags) -> StationConfig {
    StationConfig::builder(CWOP_ID, PWS_ID)
        .comment("test station")
        .flags(flags)
        .work_directory(work_dir)
        .build()
        .unwrap()
}

pub fn fetch_settings(base: &str) -> FetchSettings {
    FetchSettings {
        dashboard_url: format!("{base}/dashboard"),
        feed_url: format!("{base}/feed.asp?format=XML"),
        ..FetchSettings::default()
    }
}

pub fn upload_settings(port: u16) -> UploadSettings {
    UploadSettings {
        host: "127.0.0.1".to_string(),
        port,
        connect_timeout: Duration::from_secs(5),
        client_name: "test-client".to_string(),
    }
}

/// Accepts one connection and returns everything written to it.
pub async fn aprs_listener() -> (u16, JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        socket.read_to_end(&mut received).await.unwrap();
        received
    });
    (port, handle)
}

/// A local port with nothing listening on it.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}
