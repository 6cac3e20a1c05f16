//! Polling bridge between `crestron-api` and a host's entity registry.
//!
//! This crate owns the business logic, domain model, and reactive data
//! infrastructure for the Crestron Home workspace:
//!
//! - **[`Bridge`]**: Central facade managing the full lifecycle:
//!   [`connect()`](Bridge::connect) logs in, runs a first poll cycle, then
//!   spawns the periodic poll and the command processor.
//!   [`Bridge::oneshot()`](Bridge::oneshot) runs a single cycle for CLI use.
//!
//! - **[`Reconciler`]**: Diffs each poll against the known-device registry
//!   and drives [`EntitySink`] register / update / remove signals. A
//!   category that failed to fetch is never pruned.
//!
//! - **[`DataStore`]**: Lock-free reactive read side (`DashMap` +
//!   `tokio::sync::watch`), published once per cycle.
//!
//! - **[`Command`]**: Capability-level writes, validated against the last
//!   known snapshots and routed through an `mpsc` channel to the hub's
//!   action endpoints.
//!
//! - **Domain model** ([`model`]): [`DeviceSnapshot`] with a
//!   category-specific [`Payload`], keyed by [`DeviceKey`] (category + id).

pub mod bridge;
pub mod command;
pub mod config;
pub mod convert;
pub mod error;
pub mod fetch;
pub mod host;
pub mod model;
pub mod reconcile;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bridge::{Bridge, ConnectionState};
pub use command::{Action, Command, CommandOutcome, OutcomeStatus};
pub use config::{BridgeConfig, TlsVerification};
pub use error::CoreError;
pub use host::{EntityHandle, EntitySink, NullSink};
pub use reconcile::{CyclePhase, CycleReport, CycleSettings, Reconciler};
pub use store::DataStore;
pub use stream::EntityStream;

pub use model::{
    CategorySet, ConnectionStatus, DeviceKey, DeviceKind, DeviceSnapshot, LockState, MediaSource,
    MediaState, Payload, RoomIndex, SensorReading, Setpoint, SetpointBounds, ThermostatState,
};

// Records returned by the on-demand calls.
pub use crestron_api::{QuickActionRecord, VendorErrorKind};
