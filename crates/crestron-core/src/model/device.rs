// ── Device snapshot ──

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};

use super::payload::Payload;

/// Device category. Each category is fetched, toggled and reconciled on its own.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum DeviceKind {
    #[strum(to_string = "light", serialize = "lights")]
    Light,
    #[strum(to_string = "shade", serialize = "shades")]
    Shade,
    #[strum(to_string = "scene", serialize = "scenes")]
    Scene,
    #[strum(to_string = "sensor", serialize = "sensors")]
    Sensor,
    #[strum(to_string = "lock", serialize = "locks", serialize = "doorlocks")]
    Lock,
    #[strum(to_string = "thermostat", serialize = "thermostats")]
    Thermostat,
    #[strum(
        to_string = "security_device",
        serialize = "security_devices",
        serialize = "security"
    )]
    SecurityDevice,
    #[strum(to_string = "media_room", serialize = "media_rooms", serialize = "media")]
    MediaRoom,
}

/// Uniqueness key for a device. Ids are only unique within a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DeviceKey {
    pub kind: DeviceKind,
    pub id: u32,
}

impl DeviceKey {
    pub fn new(kind: DeviceKind, id: u32) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// The set of categories configured for inclusion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategorySet(BTreeSet<DeviceKind>);

impl CategorySet {
    /// Every category.
    pub fn all() -> Self {
        Self(DeviceKind::iter().collect())
    }

    pub fn empty() -> Self {
        Self(BTreeSet::new())
    }

    pub fn contains(&self, kind: DeviceKind) -> bool {
        self.0.contains(&kind)
    }

    pub fn insert(&mut self, kind: DeviceKind) -> bool {
        self.0.insert(kind)
    }

    pub fn remove(&mut self, kind: DeviceKind) -> bool {
        self.0.remove(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = DeviceKind> + '_ {
        self.0.iter().copied()
    }
}

impl Default for CategorySet {
    fn default() -> Self {
        Self::all()
    }
}

impl FromIterator<DeviceKind> for CategorySet {
    fn from_iter<I: IntoIterator<Item = DeviceKind>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Reported link state of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionStatus {
    Online,
    Offline,
    /// The record carried no connection field.
    Unknown,
    /// Categories with no physical link (scenes).
    #[strum(to_string = "n/a")]
    NotApplicable,
}

impl ConnectionStatus {
    pub fn from_vendor(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("online") => Self::Online,
            Some(s) if s.eq_ignore_ascii_case("offline") => Self::Offline,
            _ => Self::Unknown,
        }
    }
}

/// Uniform, normalized record for one device.
///
/// Two snapshots with the same [`DeviceKey`] describe the same entity;
/// value equality decides whether an update needs to be signalled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceSnapshot {
    pub id: u32,
    pub kind: DeviceKind,
    /// Vendor variant (`Dimmer`, `Switch`, `Drape`, `OccupancySensor`, ...).
    pub subtype: Option<String>,
    pub name: String,
    pub room_id: Option<u32>,
    pub room_name: Option<String>,
    /// The category toggle is on.
    pub enabled: bool,
    /// Should be surfaced to the host. Ignored devices stay known but hidden.
    pub visible: bool,
    pub connection: ConnectionStatus,
    pub payload: Payload,
}

impl DeviceSnapshot {
    pub fn key(&self) -> DeviceKey {
        DeviceKey::new(self.kind, self.id)
    }

    /// `"{room} {name}"` when the room resolves, otherwise the bare name.
    pub fn display_name(&self) -> String {
        match self.room_name.as_deref() {
            Some(room) if !room.is_empty() => format!("{room} {}", self.name).trim().to_owned(),
            _ => self.name.trim().to_owned(),
        }
    }

    /// A device is available unless it reports offline.
    pub fn is_available(&self) -> bool {
        self.connection != ConnectionStatus::Offline
    }
}
