mod common;

use std::fs;

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use relay_core::{PacketEncoder, SendFlags};
use relay_engine::{
    AprsIsUploader, DeliveryError, FailureKind, Relay, RelayError, ReqwestFetcher, RunOptions,
    RunOutcome, SourceMode,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::*;

const EXPECTED_PACKET: &str =
    "KH6XX-1>APRS,TCPIP*:@142213z2118.00N/15748.00W_270/008g014t072r005P042h45b10132xW2C test station";

async fn dashboard_server(epoch: i64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dashboard"))
        .and(query_param("ID", PWS_ID))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(dashboard_page(epoch), "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;
    server
}

fn relay(server: &MockServer, port: u16) -> Relay<ReqwestFetcher, AprsIsUploader> {
    Relay::new(
        ReqwestFetcher::new(fetch_settings(&server.uri())),
        AprsIsUploader::new(upload_settings(port)),
    )
    .with_encoder(PacketEncoder::with_os_code('x'))
    .with_clock(|| Utc.with_ymd_and_hms(2023, 11, 14, 22, 15, 0).unwrap())
}

#[tokio::test]
async fn new_observation_is_sent_and_logged() {
    relay_logging::initialize_for_tests();
    let work = TempDir::new().unwrap();
    let server = dashboard_server(OBSERVED_AT).await;
    let (port, received) = aprs_listener().await;
    let config = station_config(work.path(), SendFlags::default());

    let outcome = relay(&server, port)
        .run(&config, &RunOptions::default())
        .await
        .unwrap();

    let (packet, delivery) = match outcome {
        RunOutcome::Transmitted { packet, delivery } => (packet, delivery),
        other => panic!("expected a transmission, got {other:?}"),
    };
    assert_eq!(packet.text, EXPECTED_PACKET);
    assert!(delivery.is_ok());

    let received = String::from_utf8(received.await.unwrap()).unwrap();
    assert_eq!(
        received,
        format!("user KH6XX-1 pass -1 vers test-client\r{EXPECTED_PACKET}\r")
    );

    let ts = fs::read_to_string(work.path().join("KHIHONOL12.ts")).unwrap();
    assert_eq!(ts, OBSERVED_AT.to_string());
    let pkt = fs::read_to_string(work.path().join("KH6XX-1.pkt")).unwrap();
    assert_eq!(pkt, format!("{EXPECTED_PACKET}\n"));
    let log = fs::read_to_string(work.path().join("KH6XX-1.log")).unwrap();
    assert_eq!(log, "142215z _270 /008 g014 t072 r005 P042 h45 b10132\n");
    // Duplicate sends are allowed by default, so no fingerprint is kept.
    assert!(!work.path().join("KH6XX-1.obs").exists());
}

#[tokio::test]
async fn same_timestamp_is_not_sent_again() {
    let work = TempDir::new().unwrap();
    fs::write(work.path().join("KHIHONOL12.ts"), OBSERVED_AT.to_string()).unwrap();
    let server = dashboard_server(OBSERVED_AT).await;
    let port = closed_port().await;
    let config = station_config(work.path(), SendFlags::default());

    let outcome = relay(&server, port)
        .run(&config, &RunOptions::default())
        .await
        .unwrap();

    match outcome {
        RunOutcome::NoNewData {
            observed_at,
            last_observed_at,
            ..
        } => {
            assert_eq!(observed_at, OBSERVED_AT);
            assert_eq!(last_observed_at, OBSERVED_AT);
        }
        other => panic!("expected no new data, got {other:?}"),
    }
    assert!(!work.path().join("KH6XX-1.pkt").exists());
    assert!(!work.path().join("KH6XX-1.log").exists());
}

#[tokio::test]
async fn newer_timestamp_proceeds() {
    let work = TempDir::new().unwrap();
    fs::write(work.path().join("KHIHONOL12.ts"), (OBSERVED_AT - 1).to_string()).unwrap();
    let server = dashboard_server(OBSERVED_AT).await;
    let (port, received) = aprs_listener().await;
    let config = station_config(work.path(), SendFlags::default());

    let outcome = relay(&server, port)
        .run(&config, &RunOptions::default())
        .await
        .unwrap();
    assert!(matches!(outcome, RunOutcome::Transmitted { .. }));
    assert!(!received.await.unwrap().is_empty());
    assert_eq!(
        fs::read_to_string(work.path().join("KHIHONOL12.ts")).unwrap(),
        OBSERVED_AT.to_string()
    );
}

#[tokio::test]
async fn unchanged_fields_are_not_sent_when_dups_disabled() {
    let work = TempDir::new().unwrap();
    let server = dashboard_server(OBSERVED_AT).await;
    let flags = SendFlags {
        allow_duplicate_sends: false,
        ..SendFlags::default()
    };
    let config = station_config(work.path(), flags);

    let (port, received) = aprs_listener().await;
    let first = relay(&server, port)
        .run(&config, &RunOptions::default())
        .await
        .unwrap();
    assert!(matches!(first, RunOutcome::Transmitted { .. }));
    received.await.unwrap();
    assert_eq!(
        fs::read_to_string(work.path().join("KH6XX-1.obs")).unwrap(),
        "_270/008g014t072r005P042h45b10132"
    );

    // Forced past the time gate, the content gate still stops it.
    let port = closed_port().await;
    let options = RunOptions {
        force: true,
        ..RunOptions::default()
    };
    let second = relay(&server, port).run(&config, &options).await.unwrap();
    assert!(matches!(second, RunOutcome::NoChange { .. }));
    let pkt = fs::read_to_string(work.path().join("KH6XX-1.pkt")).unwrap();
    assert_eq!(pkt.lines().count(), 1);
}

#[tokio::test]
async fn delivery_failure_still_records_state() {
    let work = TempDir::new().unwrap();
    let server = dashboard_server(OBSERVED_AT).await;
    let port = closed_port().await;
    let config = station_config(work.path(), SendFlags::default());

    let outcome = relay(&server, port)
        .run(&config, &RunOptions::default())
        .await
        .unwrap();

    let RunOutcome::Transmitted { delivery, .. } = outcome else {
        panic!("expected a transmission attempt");
    };
    assert!(matches!(delivery, Err(DeliveryError::Connect { .. })));
    assert_eq!(
        fs::read_to_string(work.path().join("KHIHONOL12.ts")).unwrap(),
        OBSERVED_AT.to_string()
    );
    assert!(work.path().join("KH6XX-1.pkt").exists());
}

#[tokio::test]
async fn logs_can_be_disabled() {
    let work = TempDir::new().unwrap();
    let server = dashboard_server(OBSERVED_AT).await;
    let (port, received) = aprs_listener().await;
    let config = station_config(work.path(), SendFlags::default());
    let options = RunOptions {
        log_packets: false,
        log_observations: false,
        ..RunOptions::default()
    };

    relay(&server, port).run(&config, &options).await.unwrap();
    received.await.unwrap();
    assert!(!work.path().join("KH6XX-1.pkt").exists());
    assert!(!work.path().join("KH6XX-1.log").exists());
}

#[tokio::test]
async fn feed_mode_with_wind_and_rain_disabled() {
    let work = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed.asp"))
        .and(query_param("ID", PWS_ID))
        .respond_with(ResponseTemplate::new(200).set_body_raw(FEED_XML, "text/xml"))
        .mount(&server)
        .await;
    let (port, received) = aprs_listener().await;
    let flags = SendFlags {
        send_wind: false,
        send_rain: false,
        allow_duplicate_sends: true,
    };
    let config = station_config(work.path(), flags);
    let options = RunOptions {
        mode: SourceMode::Feed,
        ..RunOptions::default()
    };

    let outcome = relay(&server, port).run(&config, &options).await.unwrap();
    let RunOutcome::Transmitted { packet, .. } = outcome else {
        panic!("expected a transmission");
    };
    assert_eq!(
        packet.text,
        "KH6XX-1>APRS,TCPIP*:@142213z2118.00N/15748.00W_.../...g...t072h45b10132xW2C test station"
    );
    received.await.unwrap();
}

#[tokio::test]
async fn fetch_failure_leaves_no_state() {
    let work = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let port = closed_port().await;
    let config = station_config(work.path(), SendFlags::default());

    let err = relay(&server, port)
        .run(&config, &RunOptions::default())
        .await
        .unwrap_err();
    match err {
        RelayError::Fetch(fetch) => assert_eq!(fetch.kind, FailureKind::HttpStatus(503)),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!work.path().join("KHIHONOL12.ts").exists());
}

#[tokio::test]
async fn page_without_markers_is_a_parse_error() {
    let work = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dashboard"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html>down</html>", "text/html"))
        .mount(&server)
        .await;
    let port = closed_port().await;
    let config = station_config(work.path(), SendFlags::default());

    let err = relay(&server, port)
        .run(&config, &RunOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::Parse(_)));
}

#[tokio::test]
async fn log_write_failure_keeps_delivery_result() {
    let work = TempDir::new().unwrap();
    // A directory where the packet log should be makes the append fail.
    fs::create_dir(work.path().join("KH6XX-1.pkt")).unwrap();
    let server = dashboard_server(OBSERVED_AT).await;

    let (port, received) = aprs_listener().await;
    let config = station_config(work.path(), SendFlags::default());
    let outcome = relay(&server, port)
        .run(&config, &RunOptions::default())
        .await
        .unwrap();
    received.await.unwrap();
    match outcome {
        RunOutcome::Transmitted { delivery, .. } => assert!(delivery.is_ok()),
        other => panic!("expected a transmission, got {other:?}"),
    }
    let log = fs::read_to_string(work.path().join("KH6XX-1.log")).unwrap();
    assert_eq!(log.lines().count(), 1);

    fs::remove_file(work.path().join("KHIHONOL12.ts")).unwrap();
    let port = closed_port().await;
    let outcome = relay(&server, port)
        .run(&config, &RunOptions::default())
        .await
        .unwrap();
    match outcome {
        RunOutcome::Transmitted { delivery, .. } => {
            assert!(matches!(delivery, Err(DeliveryError::Connect { .. })))
        }
        other => panic!("expected a transmission attempt, got {other:?}"),
    }
}
