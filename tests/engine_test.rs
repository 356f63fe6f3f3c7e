//! Polling Engine Integration Tests

use pabx_exporter::config::Config;
use pabx_exporter::engine::{EngineState, FastTickOutcome, PollingEngine};
use pabx_exporter::metrics::{Gauge, PrometheusSink};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::sleep;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LOGIN: &str = "/webclient/api/Login/GetAccessToken";
const TOKEN: &str = "/connect/token";
const ACTIVE_CALLS: &str = "/xapi/v1/ActiveCalls";
const SYSTEM_STATUS: &str = "/xapi/v1/SystemStatus";

fn test_config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.pabx.base_url = server.uri();
    config.pabx.username = "0050".to_string();
    config.pabx.password = "secret".to_string();
    config.pabx.request_timeout = Duration::from_secs(2);
    config.polling.fast_interval = Duration::from_millis(50);
    config.polling.slow_interval = Duration::from_secs(10);
    config.polling.renewal_interval = Duration::from_secs(3600);
    config.polling.restart_backoff = Duration::from_millis(100);
    config
}

fn login_ok(access: &str, refresh: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "Status": "AuthSuccess",
        "Token": {
            "token_type": "Bearer",
            "expires_in": 60,
            "access_token": access,
            "refresh_token": refresh
        }
    }))
}

fn calls(records: &[(&str, &str, &str)]) -> ResponseTemplate {
    let value: Vec<_> = records
        .iter()
        .enumerate()
        .map(|(i, (caller, callee, status))| {
            serde_json::json!({"Id": i + 1, "Caller": caller, "Callee": callee, "Status": status})
        })
        .collect();

    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "@odata.count": records.len(),
        "value": value
    }))
}

fn system_status() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "FQDN": "pbx.example.com",
        "Version": "20.0.4",
        "OS": "Linux",
        "Ip": "203.0.113.7",
        "MaxSimCalls": 32,
        "CallsActive": 2,
        "ExtensionsRegistered": 41,
        "ExtensionsTotal": 50,
        "TrunksRegistered": 2,
        "TrunksTotal": 3,
        "DiskUsage": 37,
        "RecordingUsedSpace": 250,
        "RecordingQuota": 1000,
        "ChatUsedSpace": 12,
        "LogUsedSpace": 90
    }))
}

async fn requests_to(server: &MockServer, wanted: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == wanted)
        .count()
}

fn new_engine(config: &Config) -> (Arc<PrometheusSink>, PollingEngine) {
    let sink = Arc::new(PrometheusSink::new("pabx").unwrap());
    let engine = PollingEngine::new(config, sink.clone()).unwrap();
    (sink, engine)
}

#[tokio::test]
async fn test_initial_login_failure_stops_engine() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(ACTIVE_CALLS))
        .respond_with(calls(&[]))
        .expect(0)
        .mount(&server)
        .await;

    let (sink, engine) = new_engine(&test_config(&server));
    let (_tx, rx) = broadcast::channel(1);

    let result = tokio::time::timeout(Duration::from_secs(5), engine.run(rx))
        .await
        .expect("engine should stop on its own");

    assert!(result.is_err());
    assert_eq!(sink.value(Gauge::ErrorCapture, &["login"]), Some(1.0));
}

#[tokio::test]
async fn test_fast_tick_publishes_totals_and_trunks() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(login_ok("access-1", "refresh-1"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(ACTIVE_CALLS))
        .respond_with(calls(&[
            ("98765 AcmeTrunk", "1001 Bob", "Talking"),
            ("98765 AcmeTrunk", "1002 Carol", "Talking"),
            ("1003 Dave", "10002 Carrier Two (5511999)", "Talking"),
            ("PlayFile", "1004 Erin", "Talking"),
            ("1005 Frank", "1006 Grace", "Routing"),
        ]))
        .mount(&server)
        .await;

    let (sink, mut engine) = new_engine(&test_config(&server));
    engine.bootstrap().await.unwrap();
    assert_eq!(engine.state(), EngineState::Running);

    let outcome = engine.fast_tick().await.unwrap();
    assert_eq!(
        outcome,
        FastTickOutcome::Polled { total: 5, classified: 4, unparsable: 0 }
    );

    assert_eq!(sink.value(Gauge::ActiveCalls, &[]), Some(5.0));
    assert_eq!(sink.value(Gauge::TrunkCalls, &["AcmeTrunk"]), Some(2.0));
    assert_eq!(sink.value(Gauge::TrunkCalls, &["Carrier Two"]), Some(1.0));
    assert_eq!(sink.value(Gauge::TrunkCalls, &["INTERNAL_RECORDING"]), Some(1.0));
    assert_eq!(sink.value(Gauge::ErrorCapture, &["getActiveCalls"]), Some(0.0));
}

#[tokio::test]
async fn test_fast_tick_failure_leaves_gauges_untouched() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(login_ok("access-1", "refresh-1"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(ACTIVE_CALLS))
        .respond_with(calls(&[("98765 AcmeTrunk", "1001 Bob", "Talking")]))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(ACTIVE_CALLS))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (sink, mut engine) = new_engine(&test_config(&server));
    engine.bootstrap().await.unwrap();

    engine.fast_tick().await.unwrap();
    assert!(engine.fast_tick().await.is_err());

    assert_eq!(sink.value(Gauge::ActiveCalls, &[]), Some(1.0));
    assert_eq!(sink.value(Gauge::TrunkCalls, &["AcmeTrunk"]), Some(1.0));
    assert_eq!(sink.value(Gauge::ErrorCapture, &["getActiveCalls"]), Some(1.0));
}

#[tokio::test]
async fn test_failed_renewal_skips_tick_and_keeps_session() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(login_ok("access-1", "refresh-1"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(TOKEN))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "access-2",
            "token_type": "Bearer",
            "expires_in": 60
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(ACTIVE_CALLS))
        .respond_with(calls(&[]))
        .mount(&server)
        .await;

    let mut config = test_config(&server);
    config.polling.renewal_interval = Duration::ZERO;
    let (sink, mut engine) = new_engine(&config);
    engine.bootstrap().await.unwrap();

    let outcome = engine.fast_tick().await.unwrap();
    assert_eq!(outcome, FastTickOutcome::RenewalFailed);
    assert_eq!(requests_to(&server, ACTIVE_CALLS).await, 0);
    assert_eq!(engine.session().access_token(), Some("access-1"));
    assert_eq!(sink.value(Gauge::ErrorCapture, &["getRefreshToken"]), Some(1.0));

    let outcome = engine.fast_tick().await.unwrap();
    assert_eq!(
        outcome,
        FastTickOutcome::Polled { total: 0, classified: 0, unparsable: 0 }
    );
    assert_eq!(engine.session().access_token(), Some("access-2"));
    assert_eq!(engine.session().refresh_token(), Some("refresh-1"));
    assert_eq!(sink.value(Gauge::ErrorCapture, &["getRefreshToken"]), Some(0.0));
}

#[tokio::test]
async fn test_slow_tick_publishes_system_gauges() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(login_ok("access-1", "refresh-1"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SYSTEM_STATUS))
        .respond_with(system_status())
        .mount(&server)
        .await;

    let (sink, mut engine) = new_engine(&test_config(&server));
    engine.bootstrap().await.unwrap();
    engine.slow_tick().await.unwrap();

    assert_eq!(sink.value(Gauge::MaxSimultaneousCalls, &[]), Some(32.0));
    assert_eq!(sink.value(Gauge::DiskUsage, &[]), Some(37.0));
    assert_eq!(sink.value(Gauge::DiskUsageRecording, &[]), Some(25.0));
    assert_eq!(sink.value(Gauge::DiskUsageChat, &[]), Some(12.0));
    assert_eq!(sink.value(Gauge::DiskUsageLog, &[]), Some(90.0));
    assert_eq!(sink.value(Gauge::RegisteredExtensions, &[]), Some(41.0));
    assert_eq!(sink.value(Gauge::TotalExtensions, &[]), Some(50.0));
    assert_eq!(sink.value(Gauge::RegisteredTrunks, &[]), Some(2.0));
    assert_eq!(sink.value(Gauge::TotalTrunks, &[]), Some(3.0));
    assert_eq!(
        sink.value(Gauge::SystemInfo, &["20.0.4", "Linux", "203.0.113.7", "pbx.example.com"]),
        Some(1.0)
    );
    assert_eq!(sink.value(Gauge::ErrorCapture, &["getSystemInfo"]), Some(0.0));
}

#[tokio::test]
async fn test_slow_tick_tolerates_null_fields() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(login_ok("access-1", "refresh-1"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SYSTEM_STATUS))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "FQDN": null,
            "Version": "20.0.4",
            "OS": "Linux",
            "Ip": null,
            "MaxSimCalls": 32,
            "TrunksTotal": 3,
            "DiskUsage": 37,
            "RecordingUsedSpace": 250,
            "RecordingQuota": null
        })))
        .mount(&server)
        .await;

    let (sink, mut engine) = new_engine(&test_config(&server));
    engine.bootstrap().await.unwrap();
    engine.slow_tick().await.unwrap();

    assert_eq!(sink.value(Gauge::MaxSimultaneousCalls, &[]), Some(32.0));
    assert_eq!(sink.value(Gauge::TotalTrunks, &[]), Some(3.0));
    assert_eq!(sink.value(Gauge::DiskUsageRecording, &[]), Some(0.0));
    assert_eq!(sink.value(Gauge::SystemInfo, &["20.0.4", "Linux", "", ""]), Some(1.0));
    assert_eq!(sink.value(Gauge::ErrorCapture, &["getSystemInfo"]), Some(0.0));
}

#[tokio::test]
async fn test_malformed_entry_does_not_fault_the_tick() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(login_ok("access-1", "refresh-1"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(ACTIVE_CALLS))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "@odata.count": 2,
            "value": [
                {"Id": 1, "Caller": "98765 AcmeTrunk", "Callee": "1001 Bob", "Status": "Talking"},
                {"Id": 2, "Caller": "1002 Carol", "Callee": null, "Status": "Initiating"}
            ]
        })))
        .mount(&server)
        .await;

    let (sink, mut engine) = new_engine(&test_config(&server));
    engine.bootstrap().await.unwrap();

    let outcome = engine.fast_tick().await.unwrap();
    assert_eq!(
        outcome,
        FastTickOutcome::Polled { total: 2, classified: 1, unparsable: 0 }
    );
    assert_eq!(sink.value(Gauge::ActiveCalls, &[]), Some(2.0));
    assert_eq!(sink.value(Gauge::TrunkCalls, &["AcmeTrunk"]), Some(1.0));
    assert_eq!(sink.value(Gauge::ErrorCapture, &["getActiveCalls"]), Some(0.0));
}

#[tokio::test]
async fn test_slow_tick_failure_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(login_ok("access-1", "refresh-1"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SYSTEM_STATUS))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let (sink, mut engine) = new_engine(&test_config(&server));
    engine.bootstrap().await.unwrap();

    assert!(engine.slow_tick().await.is_err());
    assert_eq!(engine.state(), EngineState::Running);
    assert_eq!(sink.value(Gauge::ErrorCapture, &["getSystemInfo"]), Some(1.0));
}

#[tokio::test]
async fn test_run_restarts_after_unauthorized_poll() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(login_ok("access-1", "refresh-1"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(ACTIVE_CALLS))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(ACTIVE_CALLS))
        .respond_with(calls(&[("1001 Bob", "10002 Carrier Two", "Talking")]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SYSTEM_STATUS))
        .respond_with(system_status())
        .mount(&server)
        .await;

    let (sink, engine) = new_engine(&test_config(&server));
    let (tx, rx) = broadcast::channel(1);
    let handle = tokio::spawn(engine.run(rx));

    sleep(Duration::from_millis(800)).await;
    tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("engine should stop after shutdown")
        .unwrap();
    assert!(result.is_ok());

    assert!(requests_to(&server, LOGIN).await >= 2);
    assert!(requests_to(&server, SYSTEM_STATUS).await >= 2);
    assert_eq!(sink.value(Gauge::TrunkCalls, &["Carrier Two"]), Some(1.0));
    assert_eq!(sink.value(Gauge::ErrorCapture, &["getActiveCalls"]), Some(0.0));
}

#[tokio::test]
async fn test_run_stops_promptly_on_shutdown() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(login_ok("access-1", "refresh-1"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(ACTIVE_CALLS))
        .respond_with(calls(&[]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SYSTEM_STATUS))
        .respond_with(system_status())
        .mount(&server)
        .await;

    let mut config = test_config(&server);
    config.polling.fast_interval = Duration::from_secs(60);
    let (_, engine) = new_engine(&config);
    let (tx, rx) = broadcast::channel(1);
    let handle = tokio::spawn(engine.run(rx));

    sleep(Duration::from_millis(200)).await;
    tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("engine should stop without waiting for the next tick")
        .unwrap();
    assert!(result.is_ok());
    assert_eq!(requests_to(&server, ACTIVE_CALLS).await, 0);
    assert_eq!(requests_to(&server, SYSTEM_STATUS).await, 1);
}
