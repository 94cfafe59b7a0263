#![allow(clippy::unwrap_used)]
// Integration tests for `Session` and `Poller` using wiremock.

use std::time::Duration;

use chrono::Utc;
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use govee_cloud_core::{
    CoreError, Credentials, DecodePolicy, Poller, PollerConfig, SensorKind, SensorValue,
};

// ── Helpers ─────────────────────────────────────────────────────────

const LOGIN: &str = "/account/rest/account/v1/login";
const DEVICES: &str = "/device/rest/devices/v1/list";

fn config(server: &MockServer) -> PollerConfig {
    let credentials = Credentials::new("me@example.com", "s3cret".to_string().into());
    let mut config = PollerConfig::new(credentials);
    config.base_url = Some(Url::parse(&server.uri()).unwrap());
    config.poll_interval = Duration::ZERO;
    config
}

fn login_ok(token: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "client": { "token": token } }))
}

fn device(id: &str, sku: &str, name: &str, online: bool) -> Value {
    let data = json!({
        "online": online,
        "lastTime": Utc::now().timestamp_millis(),
        "tem": 2350,
        "hum": 4512
    });
    json!({
        "device": id,
        "sku": sku,
        "deviceName": name,
        "versionSoft": "1.04.04",
        "deviceExt": {
            "lastDeviceData": data.to_string(),
            "deviceSettings": "{\"battery\":87,\"uploadRate\":10}",
            "extResources": "{}"
        }
    })
}

fn devices_ok() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "devices": [
            device("AA:01", "H5179", "Office", true),
            device("BB:02", "H6159", "Strip Light", true),
            device("CC:03", "H5179", "Garage", false),
        ],
        "status": 200
    }))
}

fn devices_expired() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "message": "token expired", "status": 401 }))
}

// ── Session tests ───────────────────────────────────────────────────

#[tokio::test]
async fn test_first_poll_logs_in_and_reuses_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(login_ok("tok-1"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(DEVICES))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(devices_ok())
        .expect(2)
        .mount(&server)
        .await;

    let poller = Poller::new(config(&server)).unwrap();
    poller.refresh().await.unwrap();
    let snapshot = poller.refresh().await.unwrap();

    assert_eq!(snapshot.devices.len(), 2);
}

#[tokio::test]
async fn test_expired_token_relogs_once_and_retries() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(login_ok("tok-old"))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(login_ok("tok-new"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(DEVICES))
        .and(header("authorization", "Bearer tok-old"))
        .respond_with(devices_expired())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(DEVICES))
        .and(header("authorization", "Bearer tok-new"))
        .respond_with(devices_ok())
        .expect(1)
        .mount(&server)
        .await;

    let poller = Poller::new(config(&server)).unwrap();
    let snapshot = poller.refresh().await.unwrap();

    assert!(snapshot.devices.contains("AA:01"));
}

#[tokio::test]
async fn test_second_failure_surfaces_poll_failed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(login_ok("tok-3"))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(DEVICES))
        .respond_with(devices_expired())
        .expect(2)
        .mount(&server)
        .await;

    let poller = Poller::new(config(&server)).unwrap();
    let result = poller.refresh().await;

    assert!(
        matches!(result, Err(CoreError::PollFailed { ref message }) if message.contains("token expired")),
        "expected PollFailed, got: {result:?}"
    );
    assert!(poller.snapshot().is_none());
}

#[tokio::test]
async fn test_login_failure_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "message": "Incorrect password" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(DEVICES))
        .respond_with(devices_ok())
        .expect(0)
        .mount(&server)
        .await;

    let poller = Poller::new(config(&server)).unwrap();
    let result = poller.start().await;

    assert!(
        matches!(result, Err(CoreError::AuthenticationFailed { .. })),
        "expected AuthenticationFailed, got: {result:?}"
    );
    assert!(matches!(poller.entities(), Err(CoreError::NotStarted)));
}

#[tokio::test]
async fn test_decode_failure_is_not_retried() {
    let server = MockServer::start().await;

    let mut broken = device("DD:04", "H5179", "Attic", true);
    broken["deviceExt"]["lastDeviceData"] = json!("{truncated");

    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(login_ok("tok-4"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(DEVICES))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "devices": [broken] })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config(&server);
    config.decode_policy = DecodePolicy::AbortBatch;
    let poller = Poller::new(config).unwrap();
    let result = poller.refresh().await;

    match result {
        Err(CoreError::Decode { ref device_id, .. }) => assert_eq!(device_id, "DD:04"),
        other => panic!("expected Decode error, got: {other:?}"),
    }
}

// ── Poller tests ────────────────────────────────────────────────────

#[tokio::test]
async fn test_start_publishes_supported_devices() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(login_ok("tok-5"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(DEVICES))
        .respond_with(devices_ok())
        .mount(&server)
        .await;

    let poller = Poller::new(config(&server)).unwrap();
    let snapshot = poller.start().await.unwrap();

    assert_eq!(
        snapshot.devices.keys().collect::<Vec<_>>(),
        ["AA:01", "CC:03"],
        "unsupported H6159 should be dropped"
    );

    let readings = snapshot.readings(Utc::now());
    let office = readings.iter().find(|r| r.device_id == "AA:01").unwrap();
    assert_eq!(office.temperature_celsius, Some(23.5));
    assert_eq!(office.humidity_percent, Some(45.12));
    assert_eq!(office.battery_percent, Some(87));

    let garage = readings.iter().find(|r| r.device_id == "CC:03").unwrap();
    assert_eq!(garage.online, Some(false));
    assert_eq!(garage.temperature_celsius, None);

    let entities = poller.entities().unwrap();
    assert_eq!(entities.len(), 8);
    let online = entities
        .iter()
        .find(|e| e.unique_id == "onlineCC:03")
        .unwrap();
    assert_eq!(online.kind, SensorKind::Online);
    assert_eq!(
        online.state(&snapshot.devices, Utc::now()),
        Some(SensorValue::Bool(false))
    );

    poller.stop().await;
}

#[tokio::test]
async fn test_background_task_refreshes_on_interval() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(login_ok("tok-6"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(DEVICES))
        .respond_with(devices_ok())
        .mount(&server)
        .await;

    let mut config = config(&server);
    config.poll_interval = Duration::from_millis(50);
    let poller = Poller::new(config).unwrap();

    let first = poller.start().await.unwrap();
    let mut rx = poller.subscribe();

    tokio::time::timeout(Duration::from_secs(5), rx.changed())
        .await
        .expect("no refresh within timeout")
        .unwrap();

    let latest = poller.snapshot().unwrap();
    assert!(latest.fetched_at >= first.fetched_at);
    poller.stop().await;

    let requests = server.received_requests().await.unwrap();
    let list_calls = requests.iter().filter(|r| r.url.path() == DEVICES).count();
    assert!(list_calls >= 2, "expected periodic polls, saw {list_calls}");
}

#[tokio::test]
async fn test_concurrent_starts_leave_one_task() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(login_ok("tok-7"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(DEVICES))
        .respond_with(devices_ok())
        .mount(&server)
        .await;

    let mut config = config(&server);
    config.poll_interval = Duration::from_millis(20);
    let poller = Poller::new(config).unwrap();

    let (first, second) = tokio::join!(poller.start(), poller.start());
    first.unwrap();
    second.unwrap();
    poller.stop().await;

    let list_calls = |requests: Vec<wiremock::Request>| {
        requests.iter().filter(|r| r.url.path() == DEVICES).count()
    };
    let after_stop = list_calls(server.received_requests().await.unwrap());
    tokio::time::sleep(Duration::from_millis(150)).await;
    let later = list_calls(server.received_requests().await.unwrap());

    assert_eq!(after_stop, later, "a refresh task kept polling after stop()");
}
