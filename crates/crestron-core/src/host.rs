// ── Host entity sink ──
//
// The narrow interface the bridge drives on the host platform's entity
// registry. The reconciler calls `register` once per newly observed
// device, `update` when a known device's snapshot changed, and `remove`
// when it vanished or its category was disabled.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::model::DeviceSnapshot;

/// Opaque handle a sink hands back for a registered entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityHandle(u64);

impl EntityHandle {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Receives entity lifecycle signals from the reconciler.
///
/// Calls are made synchronously while a cycle is being applied, so
/// implementations should hand work off rather than block. Snapshots with
/// `visible == false` are still registered; hosts decide how to hide them.
pub trait EntitySink: Send + Sync {
    fn register(&self, snapshot: &DeviceSnapshot) -> EntityHandle;
    fn update(&self, handle: EntityHandle, snapshot: &DeviceSnapshot);
    fn remove(&self, handle: EntityHandle);
}

/// Sink for callers with no host: hands out sequential handles and drops
/// every signal.
#[derive(Debug, Default)]
pub struct NullSink {
    next: AtomicU64,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntitySink for NullSink {
    fn register(&self, _snapshot: &DeviceSnapshot) -> EntityHandle {
        EntityHandle(self.next.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn update(&self, _handle: EntityHandle, _snapshot: &DeviceSnapshot) {}

    fn remove(&self, _handle: EntityHandle) {}
}
