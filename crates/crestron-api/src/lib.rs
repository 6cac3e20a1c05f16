// crestron-api: Async Rust client for the Crestron Home REST API (`/cws/api`)

pub mod client;
pub mod error;
pub mod models;
pub mod session;
pub mod transport;

mod actions;
mod catalog;

pub use client::CrestronClient;
pub use error::{Error, VendorErrorKind};
pub use models::{
    ActionResponse, ActionStatus, AvailableSetPoint, DeviceRecord, DoorLockRecord, LightRecord,
    LightState, MediaProvider, MediaRoomRecord, QuickActionRecord, RoomRecord, SceneRecord,
    SecurityDeviceRecord, SensorRecord, SetPointValue, ShadeRecord, ShadeState, ThermostatRecord,
};
pub use session::SessionPolicy;
pub use transport::{TlsMode, TransportConfig};
