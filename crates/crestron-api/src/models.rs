// Raw wire records for the Crestron Home REST API
//
// These mirror the JSON the hub returns, field for field. Nothing here is
// normalized: levels stay in the hub's 0..=65535 range, enums stay as the
// strings the hub sends, and unknown fields land in `extra` so debug tooling
// can show them.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// ── Catalog records ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRecord {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LightRecord {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    pub room_id: Option<u32>,
    /// `Dimmer` or `Switch`.
    pub sub_type: Option<String>,
    pub level: Option<i64>,
    pub connection_status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShadeRecord {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    pub room_id: Option<u32>,
    pub sub_type: Option<String>,
    pub position: Option<i64>,
    pub connection_status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneRecord {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    pub room_id: Option<u32>,
    /// Scene flavour (`Lighting`, `Shade`, `Media`, `Climate`, ...).
    #[serde(rename = "type")]
    pub scene_type: Option<String>,
    #[serde(default)]
    pub status: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorRecord {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    pub room_id: Option<u32>,
    /// `OccupancySensor`, `PhotoSensor` or `DoorSensor`.
    pub sub_type: Option<String>,
    pub presence: Option<String>,
    pub level: Option<i64>,
    #[serde(rename = "door_status", alias = "doorStatus")]
    pub door_status: Option<String>,
    #[serde(rename = "battery_level", alias = "batteryLevel")]
    pub battery_level: Option<String>,
    pub connection_status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoorLockRecord {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    pub room_id: Option<u32>,
    pub status: Option<String>,
    pub connection_status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThermostatRecord {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    pub room_id: Option<u32>,
    pub current_mode: Option<String>,
    pub current_fan_mode: Option<String>,
    pub scheduler_state: Option<String>,
    /// Tenths of a degree in `temperature_units`.
    pub current_temperature: Option<i64>,
    pub temperature_units: Option<String>,
    #[serde(default)]
    pub current_set_point: Vec<SetPointValue>,
    #[serde(default)]
    pub available_set_points: Vec<AvailableSetPoint>,
    #[serde(default)]
    pub available_system_modes: Vec<String>,
    #[serde(default)]
    pub available_fan_modes: Vec<String>,
    pub connection_status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A setpoint value, as reported and as sent back in `SetPoint` calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetPointValue {
    /// `Heat`, `Cool`, `Auto`, ...
    #[serde(rename = "type")]
    pub kind: String,
    pub temperature: i64,
}

/// Declared bounds for one setpoint kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableSetPoint {
    #[serde(rename = "type")]
    pub kind: String,
    pub min_value: i64,
    pub max_value: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityDeviceRecord {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    pub room_id: Option<u32>,
    pub current_state: Option<String>,
    #[serde(default)]
    pub available_states: Vec<String>,
    pub connection_status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRoomRecord {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    pub room_id: Option<u32>,
    pub current_power_state: Option<String>,
    pub current_mute_state: Option<String>,
    pub current_volume_level: Option<i64>,
    pub current_provider_id: Option<u32>,
    #[serde(default)]
    pub available_providers: Vec<MediaProvider>,
    #[serde(default)]
    pub available_volume_controls: Vec<String>,
    #[serde(default)]
    pub available_mute_controls: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaProvider {
    pub id: u32,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickActionRecord {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Entry from the generic `/devices` inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    pub room_id: Option<u32>,
    #[serde(rename = "type")]
    pub device_type: Option<String>,
    pub sub_type: Option<String>,
    pub level: Option<i64>,
    pub position: Option<i64>,
    /// Boolean for scenes, free-form string for some device types.
    pub status: Option<Value>,
    pub connection_status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Action payloads ─────────────────────────────────────────────────

/// One element of a `/lights/setstate` batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LightState {
    pub id: u32,
    pub level: u32,
    /// Transition time in seconds.
    pub time: u32,
}

/// One element of a `/shades/setstate` batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShadeState {
    pub id: u32,
    pub position: u32,
}

// ── Action responses ────────────────────────────────────────────────

/// Outcome field of an action response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum ActionStatus {
    Success,
    Partial,
    Failure,
    Other(String),
}

impl From<String> for ActionStatus {
    fn from(raw: String) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "success" => Self::Success,
            "partial" => Self::Partial,
            "failure" | "failed" | "error" => Self::Failure,
            _ => Self::Other(raw),
        }
    }
}

/// `{status, errorMessage?, errorDevices?, version}` returned by every action endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub status: ActionStatus,
    pub error_message: Option<String>,
    #[serde(default, deserialize_with = "lenient_ids")]
    pub error_devices: Vec<u32>,
    pub version: Option<String>,
}

impl ActionResponse {
    /// Synthesized response for endpoints that answer 2xx with an empty body.
    pub fn accepted() -> Self {
        Self {
            status: ActionStatus::Success,
            error_message: None,
            error_devices: Vec::new(),
            version: None,
        }
    }
}

/// `errorDevices` shows up as bare ids, numeric strings, or `{id: ..}` objects.
fn lenient_ids<'de, D>(deserializer: D) -> Result<Vec<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .iter()
        .filter_map(|v| match v {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            Value::Object(map) => map.get("id").and_then(Value::as_u64),
            _ => None,
        })
        .filter_map(|id| u32::try_from(id).ok())
        .collect())
}
