// ── Type-specific payloads ──
//
// Fields a category does not report stay `None`; they are never filled
// with a zero or `false` that a consumer could mistake for a reading.

use std::fmt;

use serde::Serialize;

/// Category-specific state carried by a [`DeviceSnapshot`](super::DeviceSnapshot).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    Light {
        /// Raw level, 0..=65535. `None` when the hub omitted it.
        level: Option<u32>,
        brightness_pct: Option<u8>,
        /// `false` for switches, which only ever report 0 or full.
        dimmable: bool,
    },
    Shade {
        /// Raw position, 0 (closed) ..= 65535 (open). `None` when the hub
        /// omitted it.
        position: Option<u32>,
        open_pct: Option<u8>,
    },
    Scene {
        active: bool,
        scene_type: Option<String>,
    },
    Sensor(SensorReading),
    Lock {
        state: LockState,
    },
    Thermostat(ThermostatState),
    Security {
        current: Option<String>,
        /// States this particular panel accepts.
        available: Vec<String>,
    },
    Media(MediaState),
}

impl Payload {
    /// Short human-readable state, used by tables and logs.
    pub fn summary(&self) -> String {
        match self {
            Self::Light { level: None, .. } | Self::Shade { position: None, .. } => "unknown".into(),
            Self::Light { level: Some(0), .. } => "off".into(),
            Self::Light { .. } => "on".into(),
            Self::Shade { open_pct: Some(0), .. } => "closed".into(),
            Self::Shade { open_pct, .. } => format!("{}% open", open_pct.unwrap_or_default()),
            Self::Scene { active, .. } => if *active { "active" } else { "inactive" }.into(),
            Self::Sensor(reading) => reading.summary(),
            Self::Lock { state } => state.to_string(),
            Self::Thermostat(t) => t.mode.clone().unwrap_or_else(|| "-".into()),
            Self::Security { current, .. } => current.clone().unwrap_or_else(|| "-".into()),
            Self::Media(m) => match m.power {
                Some(true) => "on".into(),
                Some(false) => "off".into(),
                None => "-".into(),
            },
        }
    }

    /// Percentage level, for categories that have one.
    pub fn level_pct(&self) -> Option<u8> {
        match self {
            Self::Light { brightness_pct, .. } => *brightness_pct,
            Self::Shade { open_pct, .. } => *open_pct,
            Self::Media(m) => m.volume_pct,
            _ => None,
        }
    }
}

// ── Sensors ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "sensor", rename_all = "snake_case")]
pub enum SensorReading {
    Occupancy {
        /// `Vacant` and `Unavailable` both read as unoccupied.
        occupied: Option<bool>,
        presence: Option<String>,
    },
    Photo {
        lux: Option<u32>,
    },
    Door {
        open: Option<bool>,
        door_status: Option<String>,
        battery: Option<String>,
    },
    /// Subtype this bridge does not model.
    Other {
        presence: Option<String>,
        level: Option<i64>,
    },
}

impl SensorReading {
    fn summary(&self) -> String {
        match self {
            Self::Occupancy {
                occupied: Some(true),
                ..
            } => "occupied".into(),
            Self::Occupancy {
                occupied: Some(false),
                ..
            } => "vacant".into(),
            Self::Photo { lux: Some(lux) } => format!("{lux} lx"),
            Self::Door {
                door_status: Some(s),
                ..
            } => s.to_lowercase(),
            Self::Other {
                presence: Some(p), ..
            } => p.clone(),
            _ => "-".into(),
        }
    }
}

// ── Locks ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LockState {
    Locked,
    Unlocked,
    Other(String),
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Locked => f.write_str("locked"),
            Self::Unlocked => f.write_str("unlocked"),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

impl LockState {
    pub fn from_vendor(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("locked") => Self::Locked,
            Some(s) if s.eq_ignore_ascii_case("unlocked") => Self::Unlocked,
            Some(s) => Self::Other(s.to_owned()),
            None => Self::Other("unknown".into()),
        }
    }
}

// ── Thermostats ──────────────────────────────────────────────────────

/// Active setpoint. Temperatures are tenths of a degree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Setpoint {
    /// `Heat`, `Cool`, `Auto`, ...
    pub kind: String,
    pub temperature: i64,
}

/// Declared range for one setpoint kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetpointBounds {
    pub kind: String,
    pub min: i64,
    pub max: i64,
}

impl SetpointBounds {
    pub fn contains(&self, temperature: i64) -> bool {
        (self.min..=self.max).contains(&temperature)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ThermostatState {
    pub mode: Option<String>,
    pub fan_mode: Option<String>,
    pub scheduler_state: Option<String>,
    /// Tenths of a degree in `units`.
    pub current_temperature: Option<i64>,
    pub units: Option<String>,
    /// Two entries (heat and cool) when the mode is Auto.
    pub setpoints: Vec<Setpoint>,
    pub bounds: Vec<SetpointBounds>,
    pub available_modes: Vec<String>,
    pub available_fan_modes: Vec<String>,
}

impl ThermostatState {
    pub fn bounds_for(&self, kind: &str) -> Option<&SetpointBounds> {
        self.bounds.iter().find(|b| b.kind.eq_ignore_ascii_case(kind))
    }
}

// ── Media rooms ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaSource {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MediaState {
    pub power: Option<bool>,
    pub muted: Option<bool>,
    /// Raw volume, 0..=65535.
    pub volume: Option<u32>,
    pub volume_pct: Option<u8>,
    pub source_id: Option<u32>,
    pub sources: Vec<MediaSource>,
    /// `false` when the room declares its volume control as `none`.
    pub volume_control: bool,
    /// `false` when the room declares its mute control as `none`.
    pub mute_control: bool,
}
