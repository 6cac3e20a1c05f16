#![allow(clippy::unwrap_used)]
// Integration tests for `CrestronClient` using wiremock.

use std::time::Duration;

use futures_util::future::join_all;
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crestron_api::client::api_base;
use crestron_api::{
    ActionStatus, CrestronClient, Error, SessionPolicy, ShadeState, VendorErrorKind,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup_with(policy: SessionPolicy) -> (MockServer, CrestronClient) {
    let server = MockServer::start().await;
    let client = CrestronClient::with_client(
        reqwest::Client::new(),
        api_base(&server.uri()).unwrap(),
        SecretString::from("hub-token".to_string()),
        policy,
    );
    (server, client)
}

async fn setup() -> (MockServer, CrestronClient) {
    setup_with(SessionPolicy::default()).await
}

async fn mount_login(server: &MockServer, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/cws/api/login"))
        .and(header("Crestron-RestAPI-AuthToken", "hub-token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"authkey": "key-1", "version": "2.001"})),
        )
        .expect(expected)
        .mount(server)
        .await;
}

fn rooms_body() -> serde_json::Value {
    json!({"rooms": [{"id": 1, "name": "Kitchen"}, {"id": 2, "name": "Den"}], "version": "2.001"})
}

// ── Session tests ───────────────────────────────────────────────────

#[tokio::test]
async fn test_login_sends_token_and_session_key_is_used() {
    let (server, client) = setup().await;
    mount_login(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/cws/api/rooms"))
        .and(header("Crestron-RestAPI-AuthKey", "key-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rooms_body()))
        .expect(2)
        .mount(&server)
        .await;

    let rooms = client.list_rooms().await.unwrap();
    assert_eq!(rooms.len(), 2);
    client.list_rooms().await.unwrap();

    assert_eq!(client.hub_version().await.as_deref(), Some("2.001"));
}

#[tokio::test]
async fn test_login_failure() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/cws/api/login"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .mount(&server)
        .await;

    let result = client.list_rooms().await;
    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_login_without_key_is_authentication_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/cws/api/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"version": "2.001"})))
        .mount(&server)
        .await;

    let result = client.login().await;
    assert!(matches!(result, Err(Error::Authentication { .. })));
}

#[tokio::test]
async fn test_login_accepts_capitalized_key() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/cws/api/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"AuthKey": "key-9"})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/cws/api/rooms"))
        .and(header("Crestron-RestAPI-AuthKey", "key-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rooms_body()))
        .expect(1)
        .mount(&server)
        .await;

    client.list_rooms().await.unwrap();
}

#[tokio::test]
async fn test_rejected_key_triggers_single_relogin_and_retry() {
    let (server, client) = setup().await;
    mount_login(&server, 2).await;

    Mock::given(method("GET"))
        .and(path("/cws/api/rooms"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/cws/api/rooms"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rooms_body()))
        .mount(&server)
        .await;

    let rooms = client.list_rooms().await.unwrap();
    assert_eq!(rooms.len(), 2);
}

#[tokio::test]
async fn test_persistent_rejection_surfaces_session_expired() {
    let (server, client) = setup().await;
    mount_login(&server, 2).await;

    Mock::given(method("GET"))
        .and(path("/cws/api/lights"))
        .respond_with(ResponseTemplate::new(511))
        .expect(2)
        .mount(&server)
        .await;

    let result = client.list_lights().await;
    assert!(
        matches!(result, Err(Error::SessionExpired { status: 511 })),
        "expected SessionExpired, got: {result:?}"
    );
}

#[tokio::test]
async fn test_zero_max_age_logs_in_before_every_call() {
    let (server, client) = setup_with(SessionPolicy {
        max_age: Duration::ZERO,
    })
    .await;
    mount_login(&server, 3).await;

    Mock::given(method("GET"))
        .and(path("/cws/api/rooms"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rooms_body()))
        .mount(&server)
        .await;

    for _ in 0..3 {
        client.list_rooms().await.unwrap();
    }
}

#[tokio::test]
async fn test_key_reused_until_max_age_then_refreshed() {
    let (server, client) = setup_with(SessionPolicy {
        max_age: Duration::from_secs(480),
    })
    .await;

    Mock::given(method("GET"))
        .and(path("/cws/api/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"authkey": "key-1"})))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cws/api/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"authkey": "key-2"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cws/api/rooms"))
        .and(header("Crestron-RestAPI-AuthKey", "key-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rooms_body()))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cws/api/rooms"))
        .and(header("Crestron-RestAPI-AuthKey", "key-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rooms_body()))
        .expect(1)
        .mount(&server)
        .await;

    client.list_rooms().await.unwrap();

    // Only the clock moves; requests still run on real time.
    tokio::time::pause();
    tokio::time::advance(Duration::from_secs(470)).await;
    tokio::time::resume();
    client.list_rooms().await.unwrap();
    assert!(client.session_age().await.unwrap() >= Duration::from_secs(470));

    tokio::time::pause();
    tokio::time::advance(Duration::from_secs(11)).await;
    tokio::time::resume();
    client.list_rooms().await.unwrap();
    assert!(client.session_age().await.unwrap() < Duration::from_secs(480));
}

#[tokio::test]
async fn test_concurrent_callers_share_one_login() {
    let (server, client) = setup().await;
    mount_login(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/cws/api/rooms"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(rooms_body())
                .set_delay(Duration::from_millis(20)),
        )
        .expect(6)
        .mount(&server)
        .await;

    let results = join_all((0..6).map(|_| client.list_rooms())).await;
    assert!(results.iter().all(Result::is_ok));
}

#[tokio::test]
async fn test_logout_clears_session() {
    let (server, client) = setup().await;
    mount_login(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/cws/api/logout"))
        .and(header("Crestron-RestAPI-AuthKey", "key-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.login().await.unwrap();
    assert!(client.session_age().await.is_some());
    client.logout().await.unwrap();
    assert!(client.session_age().await.is_none());
}

// ── Catalog tests ───────────────────────────────────────────────────

#[tokio::test]
async fn test_list_door_locks_uses_camel_case_wrapper() {
    let (server, client) = setup().await;
    mount_login(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/cws/api/doorlocks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "doorLocks": [{"id": 30, "name": "Front", "roomId": 1, "status": "locked"}]
        })))
        .mount(&server)
        .await;

    let locks = client.list_door_locks().await.unwrap();
    assert_eq!(locks.len(), 1);
    assert_eq!(locks[0].status.as_deref(), Some("locked"));
}

#[tokio::test]
async fn test_empty_detail_is_not_found() {
    let (server, client) = setup().await;
    mount_login(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/cws/api/lights/99"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"lights": []})))
        .mount(&server)
        .await;

    let result = client.get_light(99).await;
    assert!(matches!(
        result,
        Err(Error::NotFound {
            resource: "light",
            id: 99
        })
    ));
}

#[tokio::test]
async fn test_server_error_is_classified() {
    let (server, client) = setup().await;
    mount_login(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/cws/api/scenes"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"errorSource": 7, "errorMessage": "busy"})),
        )
        .mount(&server)
        .await;

    let err = client.list_scenes().await.unwrap_err();
    assert!(err.is_transient());
    match err {
        Error::Vendor { kind, message, .. } => {
            assert_eq!(kind, VendorErrorKind::Server);
            assert_eq!(message, "busy");
        }
        other => panic!("expected Vendor, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_hub_is_connectivity_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = CrestronClient::with_client(
        reqwest::Client::new(),
        api_base(&format!("http://{addr}")).unwrap(),
        SecretString::from("hub-token".to_string()),
        SessionPolicy::default(),
    );

    let err = client.list_rooms().await.unwrap_err();
    assert!(err.is_connectivity(), "expected connectivity error, got: {err:?}");
}

// ── Action tests ────────────────────────────────────────────────────

#[tokio::test]
async fn test_shade_batch_partial_response() {
    let (server, client) = setup().await;
    mount_login(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/cws/api/shades/setstate"))
        .and(body_json(json!({"shades": [
            {"id": 1, "position": 65535},
            {"id": 2, "position": 65535}
        ]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "partial",
            "errorMessage": "shade 2 offline",
            "errorDevices": [2]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resp = client
        .set_shade_positions(&[
            ShadeState { id: 1, position: 65535 },
            ShadeState { id: 2, position: 65535 },
        ])
        .await
        .unwrap();

    assert_eq!(resp.status, ActionStatus::Partial);
    assert_eq!(resp.error_devices, vec![2]);
}

#[tokio::test]
async fn test_empty_action_body_reads_as_success() {
    let (server, client) = setup().await;
    mount_login(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/cws/api/doorlocks/lock/30"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let resp = client.lock_door(30).await.unwrap();
    assert_eq!(resp.status, ActionStatus::Success);
}

#[tokio::test]
async fn test_setpoint_body_shape() {
    let (server, client) = setup().await;
    mount_login(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/cws/api/thermostats/SetPoint"))
        .and(body_json(json!({
            "id": 12,
            "setpoints": [{"type": "Heat", "temperature": 700}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .expect(1)
        .mount(&server)
        .await;

    client
        .set_thermostat_setpoints(
            12,
            &[crestron_api::SetPointValue {
                kind: "Heat".into(),
                temperature: 700,
            }],
        )
        .await
        .unwrap();
}
