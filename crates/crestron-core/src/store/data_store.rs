// ── Central reactive data store ──
//
// Read side of the known-device registry. The reconciler owns the
// authoritative state; after every cycle the bridge publishes it here in
// one batch so readers and subscribers never see a half-applied cycle.

use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use tokio::sync::watch;

use super::collection::EntityCollection;
use crate::host::EntityHandle;
use crate::model::{DeviceKey, DeviceKind, DeviceSnapshot, RoomIndex};
use crate::reconcile::CycleReport;
use crate::stream::EntityStream;

/// Thread-safe, lock-free store of device snapshots, rooms, and host handles.
pub struct DataStore {
    pub(crate) devices: EntityCollection<DeviceKey, DeviceSnapshot>,
    pub(crate) rooms: ArcSwap<RoomIndex>,
    pub(crate) handles: DashMap<EntityHandle, DeviceKey>,
    pub(crate) last_cycle: watch::Sender<Option<Arc<CycleReport>>>,
}

impl DataStore {
    pub fn new() -> Self {
        let (last_cycle, _) = watch::channel(None);

        Self {
            devices: EntityCollection::new(),
            rooms: ArcSwap::from_pointee(RoomIndex::default()),
            handles: DashMap::new(),
            last_cycle,
        }
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    pub fn devices_snapshot(&self) -> Arc<Vec<Arc<DeviceSnapshot>>> {
        self.devices.snapshot()
    }

    pub fn subscribe_devices(&self) -> EntityStream<DeviceSnapshot> {
        EntityStream::new(self.devices.subscribe())
    }

    pub fn rooms(&self) -> Arc<RoomIndex> {
        self.rooms.load_full()
    }

    pub fn last_cycle(&self) -> Option<Arc<CycleReport>> {
        self.last_cycle.borrow().clone()
    }

    pub fn subscribe_cycles(&self) -> watch::Receiver<Option<Arc<CycleReport>>> {
        self.last_cycle.subscribe()
    }

    // ── Single-entity lookups ────────────────────────────────────────

    pub fn device(&self, kind: DeviceKind, id: u32) -> Option<Arc<DeviceSnapshot>> {
        self.devices.get(&DeviceKey::new(kind, id))
    }

    /// The device a host handle was issued for.
    pub fn key_for_handle(&self, handle: EntityHandle) -> Option<DeviceKey> {
        self.handles.get(&handle).map(|k| *k)
    }

    // ── Count accessors ──────────────────────────────────────────────

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    // ── Mutation (bridge only) ───────────────────────────────────────

    /// Publish the reconciler's full registry as one batch.
    pub(crate) fn publish_devices(&self, devices: Vec<DeviceSnapshot>) -> bool {
        self.devices
            .apply(devices.into_iter().map(|d| (d.key(), d)).collect())
    }

    pub(crate) fn set_rooms(&self, rooms: RoomIndex) {
        self.rooms.store(Arc::new(rooms));
    }

    pub(crate) fn record_cycle(&self, report: CycleReport) {
        self.last_cycle.send_replace(Some(Arc::new(report)));
    }
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}
