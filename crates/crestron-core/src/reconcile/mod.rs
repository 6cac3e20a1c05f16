// ── Reconciliation state machine ──
//
// One cycle walks Idle → Fetching → Diffing → Applying → Idle. The bridge
// drives the Fetching step (it owns the HTTP client) and hands the result
// to `Reconciler::run_cycle`, which is pure apart from the sink calls. That
// keeps every partial-failure rule testable without a hub.
//
// Rules enforced here:
// - a category is only pruned when its own fetch succeeded this cycle
// - a disabled category is emptied regardless of what the hub reports
// - updates are signalled only on value change, or when a room rename
//   touches a device whose category could not be re-fetched

mod diff;

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::IntoEnumIterator;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub use diff::CategoryDiff;
use diff::{diff_category, drop_category};

use crate::config::BridgeConfig;
use crate::convert::{IgnoreList, NormalizeContext, normalize};
use crate::fetch::CatalogFetch;
use crate::host::{EntityHandle, EntitySink};
use crate::model::{CategorySet, DeviceKey, DeviceKind, DeviceSnapshot, RoomIndex};

/// Where the current cycle is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum CyclePhase {
    Idle,
    Fetching,
    Diffing,
    Applying,
}

/// Summary of one completed cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub failed_categories: Vec<DeviceKind>,
    pub rooms_synced: bool,
    pub finished_at: DateTime<Utc>,
}

impl CycleReport {
    pub fn is_clean(&self) -> bool {
        self.failed_categories.is_empty()
    }

    pub fn changes(&self) -> usize {
        self.added + self.updated + self.removed
    }
}

/// The slice of `BridgeConfig` a cycle reads.
#[derive(Debug, Clone)]
pub struct CycleSettings {
    pub categories: CategorySet,
    pub ignored: IgnoreList,
    pub room_sync_every: u32,
}

impl From<&BridgeConfig> for CycleSettings {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            categories: config.categories.clone(),
            ignored: IgnoreList::new(&config.ignored_devices),
            room_sync_every: config.room_sync_every,
        }
    }
}

/// A registry entry: the host handle plus the last applied snapshot.
#[derive(Debug, Clone)]
pub(crate) struct Known {
    pub(crate) handle: EntityHandle,
    pub(crate) snapshot: DeviceSnapshot,
}

/// The known-device registry and the cycle state machine around it.
pub struct Reconciler {
    known: HashMap<DeviceKey, Known>,
    rooms: RoomIndex,
    rooms_loaded: bool,
    cycle: u64,
    phase: watch::Sender<CyclePhase>,
}

impl Reconciler {
    pub fn new() -> Self {
        let (phase, _) = watch::channel(CyclePhase::Idle);
        Self {
            known: HashMap::new(),
            rooms: RoomIndex::default(),
            rooms_loaded: false,
            cycle: 0,
            phase,
        }
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<CyclePhase> {
        self.phase.subscribe()
    }

    /// Number of completed cycles.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn rooms(&self) -> &RoomIndex {
        &self.rooms
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    pub fn get(&self, key: &DeviceKey) -> Option<&DeviceSnapshot> {
        self.known.get(key).map(|k| &k.snapshot)
    }

    pub fn handle(&self, key: &DeviceKey) -> Option<EntityHandle> {
        self.known.get(key).map(|k| k.handle)
    }

    /// Every known snapshot, key-ordered.
    pub fn snapshots(&self) -> Vec<DeviceSnapshot> {
        let mut all: Vec<DeviceSnapshot> =
            self.known.values().map(|k| k.snapshot.clone()).collect();
        all.sort_by_key(DeviceSnapshot::key);
        all
    }

    /// Whether the next cycle should re-fetch rooms: until the first
    /// successful sync, then on every `room_sync_every`-th cycle.
    pub fn rooms_due(&self, settings: &CycleSettings) -> bool {
        let every = u64::from(settings.room_sync_every.max(1));
        !self.rooms_loaded || (self.cycle + 1) % every == 0
    }

    /// Mark the Fetching phase; the caller performs the fetch.
    pub fn begin_fetch(&self) {
        self.phase.send_replace(CyclePhase::Fetching);
    }

    /// Return to Idle without applying anything (abandoned cycle).
    pub fn abandon(&self) {
        self.phase.send_replace(CyclePhase::Idle);
    }

    /// Diff `fetch` against the registry and apply the result through `sink`.
    pub fn run_cycle(
        &mut self,
        fetch: &CatalogFetch,
        settings: &CycleSettings,
        sink: &dyn EntitySink,
    ) -> CycleReport {
        self.cycle += 1;
        self.phase.send_replace(CyclePhase::Diffing);

        let (rooms_synced, renamed) = self.sync_rooms(fetch.rooms.as_ref());

        let mut plan: Vec<CategoryDiff> = Vec::new();
        let mut fetched: HashSet<DeviceKind> = HashSet::new();
        let mut failed: Vec<DeviceKind> = Vec::new();

        let ctx = NormalizeContext {
            rooms: &self.rooms,
            categories: &settings.categories,
            ignored: &settings.ignored,
        };

        for (kind, result) in &fetch.categories {
            let kind = *kind;
            if !settings.categories.contains(kind) {
                continue;
            }
            match result {
                Ok(records) => {
                    let incoming = records
                        .iter()
                        .filter(|r| r.kind() == kind)
                        .map(|r| normalize(r, &ctx))
                        .collect();
                    plan.push(diff_category(kind, &self.known, incoming));
                    fetched.insert(kind);
                }
                Err(e) => {
                    warn!(kind = %kind, error = %e, "category fetch failed, keeping previous state");
                    failed.push(kind);
                }
            }
        }

        for kind in DeviceKind::iter().filter(|k| !settings.categories.contains(*k)) {
            let diff = drop_category(kind, &self.known);
            if !diff.is_empty() {
                debug!(kind = %kind, count = diff.removed.len(), "category disabled, dropping devices");
                plan.push(diff);
            }
        }

        // Renamed rooms still reach devices whose category was not re-fetched.
        let carried: Vec<DeviceSnapshot> = if renamed.is_empty() {
            Vec::new()
        } else {
            self.known
                .iter()
                .filter(|(key, _)| settings.categories.contains(key.kind) && !fetched.contains(&key.kind))
                .filter(|(_, k)| k.snapshot.room_id.is_some_and(|r| renamed.contains(&r)))
                .map(|(_, k)| {
                    let mut snap = k.snapshot.clone();
                    snap.room_name = self.rooms.resolve(snap.room_id);
                    snap.visible = snap.enabled && !settings.ignored.matches(&snap);
                    snap
                })
                .collect()
        };

        self.phase.send_replace(CyclePhase::Applying);

        let mut report = CycleReport {
            cycle: self.cycle,
            added: 0,
            updated: 0,
            removed: 0,
            failed_categories: failed,
            rooms_synced,
            finished_at: Utc::now(),
        };

        for diff in plan {
            self.apply(diff, sink, &mut report);
        }
        for snap in carried {
            self.apply_update(snap, sink, &mut report);
        }

        report.finished_at = Utc::now();
        self.phase.send_replace(CyclePhase::Idle);

        if report.changes() > 0 || !report.is_clean() {
            info!(
                cycle = report.cycle,
                added = report.added,
                updated = report.updated,
                removed = report.removed,
                failed = report.failed_categories.len(),
                "reconciliation cycle applied"
            );
        } else {
            debug!(cycle = report.cycle, known = self.known.len(), "reconciliation cycle: no changes");
        }

        report
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Swap in a fresh room index. Returns whether a sync happened and
    /// which previously known rooms were renamed or dropped.
    fn sync_rooms(
        &mut self,
        rooms: Option<&Result<Vec<crestron_api::RoomRecord>, crestron_api::Error>>,
    ) -> (bool, HashSet<u32>) {
        match rooms {
            None => (false, HashSet::new()),
            Some(Ok(records)) => {
                let next = RoomIndex::from_records(records);
                let renamed: HashSet<u32> = if self.rooms_loaded {
                    self.rooms.changed_in(&next).into_iter().collect()
                } else {
                    HashSet::new()
                };
                if !renamed.is_empty() {
                    info!(count = renamed.len(), "rooms renamed since last sync");
                }
                self.rooms = next;
                self.rooms_loaded = true;
                (true, renamed)
            }
            Some(Err(e)) => {
                warn!(error = %e, "room sync failed, keeping previous room names");
                (false, HashSet::new())
            }
        }
    }

    fn apply(&mut self, diff: CategoryDiff, sink: &dyn EntitySink, report: &mut CycleReport) {
        for snapshot in diff.added {
            let handle = sink.register(&snapshot);
            debug!(key = %snapshot.key(), %handle, name = %snapshot.display_name(), "device added");
            self.known.insert(snapshot.key(), Known { handle, snapshot });
            report.added += 1;
        }
        for snapshot in diff.updated {
            self.apply_update(snapshot, sink, report);
        }
        for key in diff.removed {
            if let Some(known) = self.known.remove(&key) {
                sink.remove(known.handle);
                debug!(%key, handle = %known.handle, "device removed");
                report.removed += 1;
            }
        }
    }

    fn apply_update(&mut self, snapshot: DeviceSnapshot, sink: &dyn EntitySink, report: &mut CycleReport) {
        if let Some(known) = self.known.get_mut(&snapshot.key()) {
            sink.update(known.handle, &snapshot);
            known.snapshot = snapshot;
            report.updated += 1;
        }
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::convert::RawDevice;
    use crate::model::Payload;

    // ── Helpers ──────────────────────────────────────────────────────

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Signal {
        Register(DeviceKey, Option<String>),
        Update(DeviceKey, Option<String>),
        Remove(EntityHandle),
    }

    #[derive(Default)]
    struct RecordingSink {
        next: Mutex<u64>,
        signals: Mutex<Vec<Signal>>,
    }

    impl RecordingSink {
        fn take(&self) -> Vec<Signal> {
            std::mem::take(&mut *self.signals.lock().unwrap())
        }
    }

    impl EntitySink for RecordingSink {
        fn register(&self, snapshot: &DeviceSnapshot) -> EntityHandle {
            let mut next = self.next.lock().unwrap();
            *next += 1;
            self.signals
                .lock()
                .unwrap()
                .push(Signal::Register(snapshot.key(), snapshot.room_name.clone()));
            EntityHandle::new(*next)
        }

        fn update(&self, _handle: EntityHandle, snapshot: &DeviceSnapshot) {
            self.signals
                .lock()
                .unwrap()
                .push(Signal::Update(snapshot.key(), snapshot.room_name.clone()));
        }

        fn remove(&self, handle: EntityHandle) {
            self.signals.lock().unwrap().push(Signal::Remove(handle));
        }
    }

    fn settings(every: u32) -> CycleSettings {
        CycleSettings {
            categories: CategorySet::all(),
            ignored: IgnoreList::default(),
            room_sync_every: every,
        }
    }

    fn rooms(list: &[(u32, &str)]) -> Vec<crestron_api::RoomRecord> {
        list.iter()
            .map(|(id, name)| serde_json::from_value(json!({"id": id, "name": name})).unwrap())
            .collect()
    }

    fn lights(list: &[serde_json::Value]) -> Vec<RawDevice> {
        list.iter()
            .map(|v| RawDevice::Light(serde_json::from_value(v.clone()).unwrap()))
            .collect()
    }

    fn shades(list: &[serde_json::Value]) -> Vec<RawDevice> {
        list.iter()
            .map(|v| RawDevice::Shade(serde_json::from_value(v.clone()).unwrap()))
            .collect()
    }

    fn failure() -> crestron_api::Error {
        crestron_api::Error::Timeout { timeout_secs: 30 }
    }

    fn gym_light() -> serde_json::Value {
        json!({"id": 10, "name": "Ceiling", "roomId": 1, "subType": "Dimmer", "level": 0})
    }

    fn fetch(
        rec: &Reconciler,
        settings: &CycleSettings,
        room_list: &[(u32, &str)],
        categories: Vec<(DeviceKind, Result<Vec<RawDevice>, crestron_api::Error>)>,
    ) -> CatalogFetch {
        CatalogFetch {
            rooms: rec.rooms_due(settings).then(|| Ok(rooms(room_list))),
            categories,
        }
    }

    const LIGHT_10: DeviceKey = DeviceKey {
        kind: DeviceKind::Light,
        id: 10,
    };

    // ── Scenarios ────────────────────────────────────────────────────

    #[test]
    fn create_rename_then_disable() {
        let sink = RecordingSink::default();
        let mut rec = Reconciler::new();
        let mut cfg = settings(3);

        let f = fetch(&rec, &cfg, &[(1, "Gym")], vec![(DeviceKind::Light, Ok(lights(&[gym_light()])))]);
        let report = rec.run_cycle(&f, &cfg, &sink);
        assert_eq!(report.added, 1);
        assert!(report.rooms_synced);
        assert_eq!(sink.take(), vec![Signal::Register(LIGHT_10, Some("Gym".into()))]);
        match &rec.get(&LIGHT_10).unwrap().payload {
            Payload::Light { brightness_pct, .. } => assert_eq!(*brightness_pct, Some(0)),
            other => panic!("unexpected payload {other:?}"),
        }

        // Cycle 2: rooms not due, the hub already renamed the room.
        let f = fetch(&rec, &cfg, &[(1, "Fitness Room")], vec![(DeviceKind::Light, Ok(lights(&[gym_light()])))]);
        assert!(f.rooms.is_none());
        let report = rec.run_cycle(&f, &cfg, &sink);
        assert_eq!(report.changes(), 0);
        assert!(sink.take().is_empty());

        // Cycle 3: resync picks up the new name.
        let f = fetch(&rec, &cfg, &[(1, "Fitness Room")], vec![(DeviceKind::Light, Ok(lights(&[gym_light()])))]);
        let report = rec.run_cycle(&f, &cfg, &sink);
        assert!(report.rooms_synced);
        assert_eq!(report.updated, 1);
        assert_eq!(
            sink.take(),
            vec![Signal::Update(LIGHT_10, Some("Fitness Room".into()))]
        );
        let snap = rec.get(&LIGHT_10).unwrap();
        assert_eq!(snap.id, 10);
        assert_eq!(snap.display_name(), "Fitness Room Ceiling");

        // Cycle 4: lights disabled, hub still reports the light.
        cfg.categories.remove(DeviceKind::Light);
        let f = fetch(&rec, &cfg, &[], vec![(DeviceKind::Light, Ok(lights(&[gym_light()])))]);
        let report = rec.run_cycle(&f, &cfg, &sink);
        assert_eq!(report.removed, 1);
        assert_eq!(sink.take(), vec![Signal::Remove(EntityHandle::new(1))]);
        assert!(rec.is_empty());
    }

    #[test]
    fn identical_fetches_are_idempotent() {
        let sink = RecordingSink::default();
        let mut rec = Reconciler::new();
        let cfg = settings(10);

        for _ in 0..3 {
            let f = fetch(&rec, &cfg, &[(1, "Gym")], vec![(DeviceKind::Light, Ok(lights(&[gym_light()])))]);
            rec.run_cycle(&f, &cfg, &sink);
        }
        let signals = sink.take();
        assert_eq!(signals.len(), 1, "only the initial register: {signals:?}");

        // A level change is an update, nothing else.
        let brighter = json!({"id": 10, "name": "Ceiling", "roomId": 1, "subType": "Dimmer", "level": 65535});
        let f = fetch(&rec, &cfg, &[(1, "Gym")], vec![(DeviceKind::Light, Ok(lights(&[brighter])))]);
        let report = rec.run_cycle(&f, &cfg, &sink);
        assert_eq!((report.added, report.updated, report.removed), (0, 1, 0));
    }

    #[test]
    fn failed_fetch_never_removes() {
        let sink = RecordingSink::default();
        let mut rec = Reconciler::new();
        let cfg = settings(10);

        let f = fetch(
            &rec,
            &cfg,
            &[(1, "Gym")],
            vec![
                (DeviceKind::Light, Ok(lights(&[gym_light()]))),
                (DeviceKind::Shade, Ok(shades(&[json!({"id": 1, "name": "Blind", "position": 0})]))),
            ],
        );
        rec.run_cycle(&f, &cfg, &sink);
        sink.take();

        let f = fetch(
            &rec,
            &cfg,
            &[],
            vec![(DeviceKind::Light, Err(failure())), (DeviceKind::Shade, Ok(Vec::new()))],
        );
        let report = rec.run_cycle(&f, &cfg, &sink);

        assert_eq!(report.failed_categories, vec![DeviceKind::Light]);
        assert_eq!(report.removed, 1);
        assert!(rec.get(&LIGHT_10).is_some());
        assert!(rec.get(&DeviceKey::new(DeviceKind::Shade, 1)).is_none());
    }

    #[test]
    fn registry_is_union_of_fresh_and_untouched_categories() {
        let sink = RecordingSink::default();
        let mut rec = Reconciler::new();
        let cfg = settings(10);

        let f = fetch(
            &rec,
            &cfg,
            &[(1, "Gym")],
            vec![
                (DeviceKind::Light, Ok(lights(&[gym_light(), json!({"id": 11, "name": "Lamp"})]))),
                (DeviceKind::Shade, Ok(shades(&[json!({"id": 1, "name": "Blind"})]))),
            ],
        );
        rec.run_cycle(&f, &cfg, &sink);

        let f = fetch(
            &rec,
            &cfg,
            &[],
            vec![
                (DeviceKind::Light, Ok(lights(&[json!({"id": 12, "name": "Sconce"})]))),
                (DeviceKind::Shade, Err(failure())),
            ],
        );
        rec.run_cycle(&f, &cfg, &sink);

        let keys: Vec<DeviceKey> = rec.snapshots().iter().map(DeviceSnapshot::key).collect();
        assert_eq!(
            keys,
            vec![
                DeviceKey::new(DeviceKind::Light, 12),
                DeviceKey::new(DeviceKind::Shade, 1),
            ]
        );
    }

    #[test]
    fn same_id_in_two_categories_are_distinct_devices() {
        let sink = RecordingSink::default();
        let mut rec = Reconciler::new();
        let cfg = settings(10);

        let f = fetch(
            &rec,
            &cfg,
            &[],
            vec![
                (DeviceKind::Light, Ok(lights(&[json!({"id": 1, "name": "Lamp"})]))),
                (DeviceKind::Shade, Ok(shades(&[json!({"id": 1, "name": "Blind"})]))),
            ],
        );
        let report = rec.run_cycle(&f, &cfg, &sink);
        assert_eq!(report.added, 2);
        assert_eq!(rec.len(), 2);
    }

    #[test]
    fn rename_reaches_devices_in_failed_categories() {
        let sink = RecordingSink::default();
        let mut rec = Reconciler::new();
        let cfg = settings(2);

        let f = fetch(&rec, &cfg, &[(1, "Gym")], vec![(DeviceKind::Light, Ok(lights(&[gym_light()])))]);
        rec.run_cycle(&f, &cfg, &sink);
        sink.take();

        let f = fetch(&rec, &cfg, &[(1, "Fitness Room")], vec![(DeviceKind::Light, Err(failure()))]);
        assert!(f.rooms.is_some());
        let report = rec.run_cycle(&f, &cfg, &sink);

        assert_eq!(report.updated, 1);
        assert_eq!(
            sink.take(),
            vec![Signal::Update(LIGHT_10, Some("Fitness Room".into()))]
        );
    }

    #[test]
    fn failed_room_sync_is_retried_next_cycle() {
        let sink = RecordingSink::default();
        let mut rec = Reconciler::new();
        let cfg = settings(10);

        let f = CatalogFetch {
            rooms: Some(Err(failure())),
            categories: vec![(DeviceKind::Light, Ok(lights(&[gym_light()])))],
        };
        let report = rec.run_cycle(&f, &cfg, &sink);
        assert!(!report.rooms_synced);
        assert_eq!(rec.get(&LIGHT_10).unwrap().room_name, None);
        assert!(rec.rooms_due(&cfg));

        let f = fetch(&rec, &cfg, &[(1, "Gym")], vec![(DeviceKind::Light, Ok(lights(&[gym_light()])))]);
        let report = rec.run_cycle(&f, &cfg, &sink);
        assert_eq!(report.updated, 1);
        assert_eq!(rec.get(&LIGHT_10).unwrap().room_name.as_deref(), Some("Gym"));
    }

    #[test]
    fn phase_returns_to_idle() {
        let sink = RecordingSink::default();
        let mut rec = Reconciler::new();
        let cfg = settings(10);
        let phase = rec.subscribe_phase();

        rec.begin_fetch();
        assert_eq!(*phase.borrow(), CyclePhase::Fetching);

        let f = fetch(&rec, &cfg, &[], Vec::new());
        rec.run_cycle(&f, &cfg, &sink);
        assert_eq!(*phase.borrow(), CyclePhase::Idle);
    }
}
