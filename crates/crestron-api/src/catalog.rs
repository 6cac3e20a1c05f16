// Catalog reads
//
// Every list endpoint wraps its array under a category key (`{"lights": [...]}`)
// and every detail endpoint returns the same wrapper with a single element.
// Key lookup is case-insensitive because firmware revisions disagree on
// `doorLocks` vs `doorlocks`.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::client::CrestronClient;
use crate::error::Error;
use crate::models::{
    DeviceRecord, DoorLockRecord, LightRecord, MediaRoomRecord, QuickActionRecord, RoomRecord,
    SceneRecord, SecurityDeviceRecord, SensorRecord, ShadeRecord, ThermostatRecord,
};

impl CrestronClient {
    async fn list<T: DeserializeOwned>(&self, path: &str, key: &str) -> Result<Vec<T>, Error> {
        let value: Value = self.get(path).await?;
        unwrap_list(value, key)
    }

    async fn detail<T: DeserializeOwned>(
        &self,
        path: &str,
        key: &str,
        resource: &'static str,
        id: u32,
    ) -> Result<T, Error> {
        self.list(&format!("{path}/{id}"), key)
            .await?
            .into_iter()
            .next()
            .ok_or(Error::NotFound { resource, id })
    }

    // ── Rooms & inventory ────────────────────────────────────────────

    /// List all rooms (`GET /rooms`).
    pub async fn list_rooms(&self) -> Result<Vec<RoomRecord>, Error> {
        self.list("rooms", "rooms").await
    }

    /// Generic inventory across every device type (`GET /devices`).
    pub async fn list_devices(&self) -> Result<Vec<DeviceRecord>, Error> {
        self.list("devices", "devices").await
    }

    /// One entry from the generic inventory.
    pub async fn get_device(&self, id: u32) -> Result<DeviceRecord, Error> {
        self.detail("devices", "devices", "device", id).await
    }

    // ── Typed categories ─────────────────────────────────────────────

    pub async fn list_lights(&self) -> Result<Vec<LightRecord>, Error> {
        self.list("lights", "lights").await
    }

    pub async fn get_light(&self, id: u32) -> Result<LightRecord, Error> {
        self.detail("lights", "lights", "light", id).await
    }

    pub async fn list_shades(&self) -> Result<Vec<ShadeRecord>, Error> {
        self.list("shades", "shades").await
    }

    pub async fn get_shade(&self, id: u32) -> Result<ShadeRecord, Error> {
        self.detail("shades", "shades", "shade", id).await
    }

    pub async fn list_scenes(&self) -> Result<Vec<SceneRecord>, Error> {
        self.list("scenes", "scenes").await
    }

    pub async fn get_scene(&self, id: u32) -> Result<SceneRecord, Error> {
        self.detail("scenes", "scenes", "scene", id).await
    }

    pub async fn list_sensors(&self) -> Result<Vec<SensorRecord>, Error> {
        self.list("sensors", "sensors").await
    }

    pub async fn get_sensor(&self, id: u32) -> Result<SensorRecord, Error> {
        self.detail("sensors", "sensors", "sensor", id).await
    }

    pub async fn list_door_locks(&self) -> Result<Vec<DoorLockRecord>, Error> {
        self.list("doorlocks", "doorLocks").await
    }

    pub async fn list_thermostats(&self) -> Result<Vec<ThermostatRecord>, Error> {
        self.list("thermostats", "thermostats").await
    }

    pub async fn get_thermostat(&self, id: u32) -> Result<ThermostatRecord, Error> {
        self.detail("thermostats", "thermostats", "thermostat", id)
            .await
    }

    pub async fn list_security_devices(&self) -> Result<Vec<SecurityDeviceRecord>, Error> {
        self.list("securitydevices", "securityDevices").await
    }

    pub async fn list_media_rooms(&self) -> Result<Vec<MediaRoomRecord>, Error> {
        self.list("mediarooms", "mediaRooms").await
    }

    pub async fn list_quick_actions(&self) -> Result<Vec<QuickActionRecord>, Error> {
        self.list("quickactions", "quickActions").await
    }

    /// Raw JSON from any API path, for debug tooling.
    pub async fn raw_get(&self, path: &str) -> Result<Value, Error> {
        self.get(path).await
    }
}

/// Pull the array stored under `key` out of a wrapper object.
///
/// A missing or null key reads as an empty list: hubs without a given
/// subsystem omit it rather than returning `[]`.
fn unwrap_list<T: DeserializeOwned>(value: Value, key: &str) -> Result<Vec<T>, Error> {
    let Value::Object(map) = value else {
        return Err(Error::Deserialization {
            message: format!("expected an object wrapping `{key}`"),
            body: value.to_string(),
        });
    };

    let Some(items) = map
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v)
    else {
        debug!(key, "wrapper key absent, treating as empty");
        return Ok(Vec::new());
    };

    if items.is_null() {
        return Ok(Vec::new());
    }

    Vec::<T>::deserialize(items).map_err(|e| Error::Deserialization {
        message: format!("{key}: {e}"),
        body: items.to_string(),
    })
}
