// ── Domain model ──
//
// Canonical, vendor-independent types the rest of the crate works with.

mod device;
mod payload;
mod room;

pub use device::{CategorySet, ConnectionStatus, DeviceKey, DeviceKind, DeviceSnapshot};
pub use payload::{
    LockState, MediaSource, MediaState, Payload, SensorReading, Setpoint, SetpointBounds,
    ThermostatState,
};
pub use room::RoomIndex;
