#![allow(clippy::unwrap_used)]
// End-to-end tests for `Bridge` against a wiremock hub.

use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crestron_core::{
    Action, Bridge, BridgeConfig, CategorySet, Command, ConnectionState, CoreError, DeviceKey,
    DeviceKind, DeviceSnapshot, EntityHandle, EntitySink, NullSink, OutcomeStatus, Payload,
    Setpoint,
};

// ── Helpers ─────────────────────────────────────────────────────────

#[derive(Default)]
struct CaptureSink {
    registered: Mutex<Vec<(EntityHandle, DeviceKey)>>,
    removed: Mutex<Vec<EntityHandle>>,
}

impl CaptureSink {
    fn handle_of(&self, kind: DeviceKind, id: u32) -> EntityHandle {
        self.registered
            .lock()
            .unwrap()
            .iter()
            .find(|(_, key)| *key == DeviceKey::new(kind, id))
            .map(|(h, _)| *h)
            .unwrap()
    }
}

impl EntitySink for CaptureSink {
    fn register(&self, snapshot: &DeviceSnapshot) -> EntityHandle {
        let mut registered = self.registered.lock().unwrap();
        let handle = EntityHandle::new(100 + u64::try_from(registered.len()).unwrap());
        registered.push((handle, snapshot.key()));
        handle
    }

    fn update(&self, _handle: EntityHandle, _snapshot: &DeviceSnapshot) {}

    fn remove(&self, handle: EntityHandle) {
        self.removed.lock().unwrap().push(handle);
    }
}

fn config(server: &MockServer) -> BridgeConfig {
    let mut cfg = BridgeConfig::new(
        Url::parse(&server.uri()).unwrap(),
        SecretString::from("hub-token".to_string()),
    );
    cfg.categories = [DeviceKind::Light, DeviceKind::Shade, DeviceKind::Thermostat]
        .into_iter()
        .collect::<CategorySet>();
    cfg
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

async fn mount_get(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/cws/api/{route}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_catalog(server: &MockServer) {
    mount_get(
        server,
        "rooms",
        json!({"rooms": [{"id": 1, "name": "Kitchen"}, {"id": 2, "name": "Den"}]}),
    )
    .await;
    mount_get(
        server,
        "lights",
        json!({"lights": [
            {"id": 10, "name": "Pendant", "roomId": 1, "subType": "Dimmer", "level": 32768, "connectionStatus": "online"},
            {"id": 11, "name": "Porch", "roomId": 2, "subType": "Switch", "level": 0, "connectionStatus": "online"}
        ]}),
    )
    .await;
    mount_get(
        server,
        "shades",
        json!({"shades": [
            {"id": 1, "name": "East", "roomId": 2, "position": 0},
            {"id": 2, "name": "West", "roomId": 2, "position": 65535},
            {"id": 3, "name": "North", "roomId": 2, "position": 1000}
        ]}),
    )
    .await;
    mount_get(
        server,
        "thermostats",
        json!({"thermostats": [{
            "id": 30, "name": "Main", "roomId": 1,
            "currentMode": "Heat",
            "currentSetPoint": [{"type": "Heat", "temperature": 680}],
            "availableSetPoints": [{"type": "Heat", "minValue": 500, "maxValue": 900}],
            "availableSystemModes": ["Heat", "Off"]
        }]}),
    )
    .await;
}

async fn connected_bridge(server: &MockServer) -> Bridge {
    let bridge = Bridge::new(config(server), Arc::new(NullSink::new()));
    bridge.connect().await.unwrap();
    bridge
}

// ── Lifecycle tests ─────────────────────────────────────────────────

#[tokio::test]
async fn test_connect_populates_store() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    mount_catalog(&server).await;

    let bridge = connected_bridge(&server).await;

    assert_eq!(*bridge.connection_state().borrow(), ConnectionState::Connected);
    assert_eq!(bridge.devices_snapshot().len(), 6);
    assert_eq!(bridge.rooms().name(1), Some("Kitchen"));

    let pendant = bridge.device(DeviceKind::Light, 10).unwrap();
    assert_eq!(pendant.room_name.as_deref(), Some("Kitchen"));
    assert!(matches!(
        pendant.payload,
        Payload::Light {
            brightness_pct: Some(50),
            dimmable: true,
            ..
        }
    ));

    let report = bridge.last_cycle().unwrap();
    assert_eq!(report.added, 6);
    assert!(report.is_clean());
}

#[tokio::test]
async fn test_connect_fails_on_rejected_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cws/api/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let bridge = Bridge::new(config(&server), Arc::new(NullSink::new()));
    let err = bridge.connect().await.unwrap_err();

    assert!(matches!(err, CoreError::Authentication { .. }), "{err:?}");
    assert_eq!(*bridge.connection_state().borrow(), ConnectionState::Failed);
}

#[tokio::test]
async fn test_persistent_session_rejection_degrades() {
    let server = MockServer::start().await;
    mount_login(&server, 2).await;
    mount_get(&server, "rooms", json!({"rooms": []})).await;
    mount_get(&server, "shades", json!({"shades": [{"id": 1, "name": "East"}]})).await;
    mount_get(&server, "thermostats", json!({"thermostats": []})).await;
    Mock::given(method("GET"))
        .and(path("/cws/api/lights"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let bridge = connected_bridge(&server).await;

    assert_eq!(*bridge.connection_state().borrow(), ConnectionState::Degraded);
    let report = bridge.last_cycle().unwrap();
    assert_eq!(report.failed_categories, vec![DeviceKind::Light]);
    assert!(bridge.device(DeviceKind::Shade, 1).is_some());
}

#[tokio::test]
async fn test_execute_requires_connection() {
    let server = MockServer::start().await;
    let bridge = Bridge::new(config(&server), Arc::new(NullSink::new()));

    let err = bridge
        .execute(Command::single(DeviceKind::Scene, 1, Action::Recall))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::BridgeDisconnected));
}

// ── Command tests ───────────────────────────────────────────────────

#[tokio::test]
async fn test_light_level_out_of_range_never_reaches_hub() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    mount_catalog(&server).await;
    Mock::given(method("POST"))
        .and(path("/cws/api/lights/setstate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .expect(0)
        .mount(&server)
        .await;

    let bridge = connected_bridge(&server).await;
    let err = bridge
        .execute(Command::single(
            DeviceKind::Light,
            10,
            Action::SetLevel {
                level: 70_000,
                transition: None,
            },
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Validation { .. }), "{err:?}");
}

#[tokio::test]
async fn test_setpoint_outside_bounds_is_rejected() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    mount_catalog(&server).await;
    Mock::given(method("POST"))
        .and(path("/cws/api/thermostats/SetPoint"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .expect(1)
        .mount(&server)
        .await;

    let bridge = connected_bridge(&server).await;
    let too_hot = Action::SetSetpoints {
        setpoints: vec![Setpoint {
            kind: "Heat".into(),
            temperature: 950,
        }],
    };
    let err = bridge
        .execute(Command::single(DeviceKind::Thermostat, 30, too_hot))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }), "{err:?}");

    let ok = Action::SetSetpoints {
        setpoints: vec![Setpoint {
            kind: "Heat".into(),
            temperature: 700,
        }],
    };
    let outcome = bridge
        .execute(Command::single(DeviceKind::Thermostat, 30, ok))
        .await
        .unwrap();
    assert!(outcome.is_success());
}

#[tokio::test]
async fn test_unknown_device_is_not_found() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    mount_catalog(&server).await;

    let bridge = connected_bridge(&server).await;
    let err = bridge
        .execute(Command::single(DeviceKind::Shade, 99, Action::Open))
        .await
        .unwrap_err();

    assert!(
        matches!(err, CoreError::DeviceNotFound { id: 99, .. }),
        "{err:?}"
    );
}

#[tokio::test]
async fn test_shade_batch_partial_failure() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    mount_catalog(&server).await;
    Mock::given(method("POST"))
        .and(path("/cws/api/shades/setstate"))
        .and(body_json(json!({"shades": [
            {"id": 1, "position": 65535},
            {"id": 2, "position": 65535},
            {"id": 3, "position": 65535}
        ]})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "partial", "errorDevices": [2]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let bridge = connected_bridge(&server).await;
    let outcome = bridge
        .execute(Command::new(DeviceKind::Shade, vec![1, 2, 3], Action::Open))
        .await
        .unwrap();

    assert_eq!(outcome.status, OutcomeStatus::Partial);
    assert_eq!(outcome.accepted, vec![1, 3]);
    assert_eq!(outcome.failed, vec![2]);
}

#[tokio::test]
async fn test_switch_turn_on_sends_full_level_and_reuses_session() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    mount_catalog(&server).await;
    Mock::given(method("POST"))
        .and(path("/cws/api/lights/setstate"))
        .and(header("Crestron-RestAPI-AuthKey", "key-1"))
        .and(body_json(json!({"lights": [{"id": 11, "level": 65535, "time": 0}]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .expect(2)
        .mount(&server)
        .await;

    let bridge = connected_bridge(&server).await;
    for _ in 0..2 {
        let outcome = bridge
            .execute(Command::single(
                DeviceKind::Light,
                11,
                Action::SetLevel {
                    level: 10,
                    transition: None,
                },
            ))
            .await
            .unwrap();
        assert!(outcome.is_success());
    }
}

#[tokio::test]
async fn test_invoke_resolves_host_handle() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    mount_catalog(&server).await;
    Mock::given(method("POST"))
        .and(path("/cws/api/lights/setstate"))
        .and(body_json(json!({"lights": [{"id": 10, "level": 0, "time": 2}]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .expect(1)
        .mount(&server)
        .await;

    let sink = Arc::new(CaptureSink::default());
    let bridge = Bridge::new(config(&server), sink.clone());
    bridge.connect().await.unwrap();

    let handle = sink.handle_of(DeviceKind::Light, 10);

    let outcome = bridge
        .invoke(handle, Action::TurnOff { transition: Some(2) })
        .await
        .unwrap();
    assert!(outcome.is_success());

    let err = bridge
        .invoke(EntityHandle::new(9_999), Action::Open)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));
}

// ── One-shot ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_oneshot_runs_one_cycle_and_logs_out() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    mount_catalog(&server).await;
    Mock::given(method("GET"))
        .and(path("/cws/api/logout"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let count = Bridge::oneshot(config(&server), |bridge| async move {
        Ok::<_, CoreError>(bridge.devices_snapshot().len())
    })
    .await
    .unwrap();

    assert_eq!(count, 6);
}

#[tokio::test]
async fn test_disabling_category_removes_its_devices() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    mount_catalog(&server).await;

    let sink = Arc::new(CaptureSink::default());
    let bridge = Bridge::new(config(&server), sink.clone());
    bridge.connect().await.unwrap();
    let pendant = sink.handle_of(DeviceKind::Light, 10);
    let porch = sink.handle_of(DeviceKind::Light, 11);

    bridge
        .set_categories([DeviceKind::Shade, DeviceKind::Thermostat].into_iter().collect())
        .unwrap();
    // `/lights` still lists both lights; they go anyway.
    let report = bridge.poll_once().await.unwrap();

    assert_eq!(report.removed, 2);
    let mut removed = sink.removed.lock().unwrap().clone();
    removed.sort();
    let mut expected = vec![pendant, porch];
    expected.sort();
    assert_eq!(removed, expected);

    assert!(bridge.device(DeviceKind::Light, 10).is_none());
    assert_eq!(bridge.devices_snapshot().len(), 4);
    assert!(!bridge.config().categories.contains(DeviceKind::Light));

    let err = bridge.invoke(pendant, Action::TurnOn { transition: None }).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));

    bridge.disconnect().await;
}

#[tokio::test]
async fn test_set_categories_rejects_empty_set() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    mount_catalog(&server).await;

    let bridge = connected_bridge(&server).await;
    let err = bridge.set_categories(CategorySet::empty()).unwrap_err();
    assert!(matches!(err, CoreError::Config { .. }));
    assert!(bridge.config().categories.contains(DeviceKind::Light));

    bridge.disconnect().await;
}
