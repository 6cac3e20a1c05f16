// ── Vendor record → snapshot normalization ──
//
// Pure functions keyed by the `RawDevice` tag. Each category maps its wire
// record plus the current room index into one `DeviceSnapshot`. Nothing in
// here performs I/O or looks at previously known state.

use crestron_api::{
    DoorLockRecord, LightRecord, MediaRoomRecord, SceneRecord, SecurityDeviceRecord, SensorRecord,
    ShadeRecord, ThermostatRecord,
};
use tracing::debug;

use crate::model::{
    CategorySet, ConnectionStatus, DeviceKind, DeviceSnapshot, LockState, MediaSource, MediaState,
    Payload, RoomIndex, SensorReading, Setpoint, SetpointBounds, ThermostatState,
};

/// Full-scale level for lights, shades and media volume.
pub const MAX_LEVEL: u32 = 65_535;

// ── Level helpers ──────────────────────────────────────────────────

/// Clamp a wire level into `0..=MAX_LEVEL`.
pub fn clamp_level(raw: i64) -> u32 {
    u32::try_from(raw.clamp(0, i64::from(MAX_LEVEL))).unwrap_or(MAX_LEVEL)
}

/// Raw level to a rounded percentage. Non-positive levels are 0.
pub fn level_to_percent(raw: i64) -> u8 {
    let level = u64::from(clamp_level(raw));
    let max = u64::from(MAX_LEVEL);
    u8::try_from((level * 100 + max / 2) / max).unwrap_or(100)
}

/// Percentage to a rounded raw level, clamped at full scale.
pub fn percent_to_level(pct: u32) -> u32 {
    let pct = u64::from(pct.min(100));
    u32::try_from((u64::from(MAX_LEVEL) * pct + 50) / 100).unwrap_or(MAX_LEVEL)
}

fn is_switch(subtype: Option<&str>) -> bool {
    subtype.is_some_and(|s| s.eq_ignore_ascii_case("switch"))
}

// ── Ignore patterns ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum IgnorePattern {
    Exact(String),
    Prefix(String),
    Suffix(String),
    Contains(String),
}

impl IgnorePattern {
    fn parse(raw: &str) -> Option<Self> {
        let p = raw.trim().to_lowercase();
        if p.is_empty() {
            return None;
        }
        let lead = p.starts_with('%');
        let trail = p.len() > 1 && p.ends_with('%');
        let inner = p.trim_matches('%').to_owned();
        Some(match (lead, trail) {
            (true, true) => Self::Contains(inner),
            (true, false) => Self::Suffix(inner),
            (false, true) => Self::Prefix(inner),
            (false, false) => Self::Exact(inner),
        })
    }

    fn matches(&self, candidate: &str) -> bool {
        match self {
            Self::Exact(p) => candidate == p,
            Self::Prefix(p) => candidate.starts_with(p.as_str()),
            Self::Suffix(p) => candidate.ends_with(p.as_str()),
            Self::Contains(p) => candidate.contains(p.as_str()),
        }
    }
}

/// Case-insensitive device patterns using `%` as the wildcard:
/// `name`, `name%`, `%name` and `%name%`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreList {
    patterns: Vec<IgnorePattern>,
}

impl IgnoreList {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        Self {
            patterns: patterns
                .iter()
                .filter_map(|p| IgnorePattern::parse(p.as_ref()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Matches against the display name, the bare name, and the vendor subtype.
    pub fn matches(&self, snapshot: &DeviceSnapshot) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let display = snapshot.display_name().to_lowercase();
        let name = snapshot.name.trim().to_lowercase();
        let subtype = snapshot.subtype.as_deref().map(str::to_lowercase);

        self.patterns.iter().any(|p| {
            p.matches(&display)
                || p.matches(&name)
                || subtype.as_deref().is_some_and(|s| p.matches(s))
        })
    }
}

// ── Raw records ────────────────────────────────────────────────────

/// A wire record tagged with its category.
#[derive(Debug, Clone)]
pub enum RawDevice {
    Light(LightRecord),
    Shade(ShadeRecord),
    Scene(SceneRecord),
    Sensor(SensorRecord),
    Lock(DoorLockRecord),
    Thermostat(ThermostatRecord),
    SecurityDevice(SecurityDeviceRecord),
    MediaRoom(MediaRoomRecord),
}

impl RawDevice {
    pub fn kind(&self) -> DeviceKind {
        match self {
            Self::Light(_) => DeviceKind::Light,
            Self::Shade(_) => DeviceKind::Shade,
            Self::Scene(_) => DeviceKind::Scene,
            Self::Sensor(_) => DeviceKind::Sensor,
            Self::Lock(_) => DeviceKind::Lock,
            Self::Thermostat(_) => DeviceKind::Thermostat,
            Self::SecurityDevice(_) => DeviceKind::SecurityDevice,
            Self::MediaRoom(_) => DeviceKind::MediaRoom,
        }
    }

    pub fn id(&self) -> u32 {
        match self {
            Self::Light(r) => r.id,
            Self::Shade(r) => r.id,
            Self::Scene(r) => r.id,
            Self::Sensor(r) => r.id,
            Self::Lock(r) => r.id,
            Self::Thermostat(r) => r.id,
            Self::SecurityDevice(r) => r.id,
            Self::MediaRoom(r) => r.id,
        }
    }
}

/// Everything normalization reads besides the record itself.
pub struct NormalizeContext<'a> {
    pub rooms: &'a RoomIndex,
    pub categories: &'a CategorySet,
    pub ignored: &'a IgnoreList,
}

/// Common fields shared by every category.
struct Base<'r> {
    id: u32,
    name: &'r str,
    room_id: Option<u32>,
    subtype: Option<String>,
    connection: ConnectionStatus,
}

/// Map one wire record to a snapshot.
pub fn normalize(raw: &RawDevice, ctx: &NormalizeContext<'_>) -> DeviceSnapshot {
    let (base, payload) = match raw {
        RawDevice::Light(r) => light(r),
        RawDevice::Shade(r) => shade(r),
        RawDevice::Scene(r) => scene(r),
        RawDevice::Sensor(r) => sensor(r),
        RawDevice::Lock(r) => lock(r),
        RawDevice::Thermostat(r) => thermostat(r),
        RawDevice::SecurityDevice(r) => security(r),
        RawDevice::MediaRoom(r) => media(r),
    };

    let kind = raw.kind();
    let enabled = ctx.categories.contains(kind);
    let mut snapshot = DeviceSnapshot {
        id: base.id,
        kind,
        subtype: base.subtype,
        name: base.name.trim().to_owned(),
        room_id: base.room_id,
        room_name: ctx.rooms.resolve(base.room_id),
        enabled,
        visible: enabled,
        connection: base.connection,
        payload,
    };
    if snapshot.visible && ctx.ignored.matches(&snapshot) {
        snapshot.visible = false;
    }
    snapshot
}

// ── Per-category mappings ──────────────────────────────────────────

fn light(r: &LightRecord) -> (Base<'_>, Payload) {
    let dimmable = !is_switch(r.sub_type.as_deref());
    let level = r.level.map(clamp_level).map(|level| {
        if !dimmable && level > 0 { MAX_LEVEL } else { level }
    });
    if level.is_none() {
        debug!(id = r.id, "light record has no level");
    }
    (
        Base {
            id: r.id,
            name: &r.name,
            room_id: r.room_id,
            subtype: r.sub_type.clone(),
            connection: ConnectionStatus::from_vendor(r.connection_status.as_deref()),
        },
        Payload::Light {
            level,
            brightness_pct: level.map(|l| level_to_percent(i64::from(l))),
            dimmable,
        },
    )
}

fn shade(r: &ShadeRecord) -> (Base<'_>, Payload) {
    let position = r.position.map(clamp_level);
    if position.is_none() {
        debug!(id = r.id, "shade record has no position");
    }
    (
        Base {
            id: r.id,
            name: &r.name,
            room_id: r.room_id,
            subtype: r.sub_type.clone(),
            connection: ConnectionStatus::from_vendor(r.connection_status.as_deref()),
        },
        Payload::Shade {
            position,
            open_pct: position.map(|p| level_to_percent(i64::from(p))),
        },
    )
}

fn scene(r: &SceneRecord) -> (Base<'_>, Payload) {
    (
        Base {
            id: r.id,
            name: &r.name,
            room_id: r.room_id,
            subtype: r.scene_type.clone(),
            connection: ConnectionStatus::NotApplicable,
        },
        Payload::Scene {
            active: r.status,
            scene_type: r.scene_type.clone(),
        },
    )
}

fn occupancy(presence: Option<&str>) -> Option<bool> {
    match presence?.trim().to_ascii_lowercase().as_str() {
        "occupied" => Some(true),
        "vacant" | "unavailable" => Some(false),
        _ => None,
    }
}

fn door_open(status: Option<&str>) -> Option<bool> {
    match status?.trim().to_ascii_lowercase().as_str() {
        "open" => Some(true),
        "closed" => Some(false),
        _ => None,
    }
}

fn sensor(r: &SensorRecord) -> (Base<'_>, Payload) {
    let subtype = r.sub_type.as_deref().unwrap_or_default().to_ascii_lowercase();
    let reading = if subtype.contains("occupancy") {
        SensorReading::Occupancy {
            occupied: occupancy(r.presence.as_deref()),
            presence: r.presence.clone(),
        }
    } else if subtype.contains("photo") {
        SensorReading::Photo {
            lux: r.level.and_then(|l| u32::try_from(l).ok()),
        }
    } else if subtype.contains("door") {
        SensorReading::Door {
            open: door_open(r.door_status.as_deref()),
            door_status: r.door_status.clone(),
            battery: r.battery_level.clone(),
        }
    } else {
        SensorReading::Other {
            presence: r.presence.clone(),
            level: r.level,
        }
    };

    (
        Base {
            id: r.id,
            name: &r.name,
            room_id: r.room_id,
            subtype: r.sub_type.clone(),
            connection: ConnectionStatus::from_vendor(r.connection_status.as_deref()),
        },
        Payload::Sensor(reading),
    )
}

fn lock(r: &DoorLockRecord) -> (Base<'_>, Payload) {
    (
        Base {
            id: r.id,
            name: &r.name,
            room_id: r.room_id,
            subtype: None,
            connection: ConnectionStatus::from_vendor(r.connection_status.as_deref()),
        },
        Payload::Lock {
            state: LockState::from_vendor(r.status.as_deref()),
        },
    )
}

fn thermostat(r: &ThermostatRecord) -> (Base<'_>, Payload) {
    let state = ThermostatState {
        mode: r.current_mode.clone(),
        fan_mode: r.current_fan_mode.clone(),
        scheduler_state: r.scheduler_state.clone(),
        current_temperature: r.current_temperature,
        units: r.temperature_units.clone(),
        setpoints: r
            .current_set_point
            .iter()
            .map(|s| Setpoint {
                kind: s.kind.clone(),
                temperature: s.temperature,
            })
            .collect(),
        bounds: r
            .available_set_points
            .iter()
            .map(|b| SetpointBounds {
                kind: b.kind.clone(),
                min: b.min_value,
                max: b.max_value,
            })
            .collect(),
        available_modes: r.available_system_modes.clone(),
        available_fan_modes: r.available_fan_modes.clone(),
    };

    (
        Base {
            id: r.id,
            name: &r.name,
            room_id: r.room_id,
            subtype: None,
            connection: ConnectionStatus::from_vendor(r.connection_status.as_deref()),
        },
        Payload::Thermostat(state),
    )
}

fn security(r: &SecurityDeviceRecord) -> (Base<'_>, Payload) {
    (
        Base {
            id: r.id,
            name: &r.name,
            room_id: r.room_id,
            subtype: None,
            connection: ConnectionStatus::from_vendor(r.connection_status.as_deref()),
        },
        Payload::Security {
            current: r.current_state.clone(),
            available: r.available_states.clone(),
        },
    )
}

fn declares_none(controls: &[String]) -> bool {
    controls.iter().any(|c| c.trim().eq_ignore_ascii_case("none"))
}

fn on_off(raw: Option<&str>, on: &str, off: &str) -> Option<bool> {
    let raw = raw?.trim();
    if raw.eq_ignore_ascii_case(on) {
        Some(true)
    } else if raw.eq_ignore_ascii_case(off) {
        Some(false)
    } else {
        None
    }
}

fn media(r: &MediaRoomRecord) -> (Base<'_>, Payload) {
    let volume = r.current_volume_level.map(clamp_level);
    let state = MediaState {
        power: on_off(r.current_power_state.as_deref(), "on", "off"),
        muted: on_off(r.current_mute_state.as_deref(), "muted", "unmuted"),
        volume,
        volume_pct: volume.map(|v| level_to_percent(i64::from(v))),
        source_id: r.current_provider_id,
        sources: r
            .available_providers
            .iter()
            .map(|p| MediaSource {
                id: p.id,
                name: p.name.clone(),
            })
            .collect(),
        volume_control: !declares_none(&r.available_volume_controls),
        mute_control: !declares_none(&r.available_mute_controls),
    };

    (
        Base {
            id: r.id,
            name: &r.name,
            room_id: r.room_id,
            subtype: None,
            connection: ConnectionStatus::Unknown,
        },
        Payload::Media(state),
    )
}
