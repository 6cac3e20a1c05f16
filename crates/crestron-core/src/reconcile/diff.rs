// ── Per-category diff ──

use std::collections::{BTreeMap, HashMap};

use super::Known;
use crate::model::{DeviceKey, DeviceKind, DeviceSnapshot};

/// What one category's fetch changes relative to the registry.
#[derive(Debug, Default)]
pub struct CategoryDiff {
    pub added: Vec<DeviceSnapshot>,
    /// Known devices whose snapshot differs by value.
    pub updated: Vec<DeviceSnapshot>,
    pub removed: Vec<DeviceKey>,
    pub unchanged: usize,
}

impl CategoryDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// Diff a successful fetch of `kind` against the registry.
///
/// Duplicate ids in `incoming` collapse to the last record. Only devices of
/// `kind` are considered for removal.
pub(crate) fn diff_category(
    kind: DeviceKind,
    known: &HashMap<DeviceKey, Known>,
    incoming: Vec<DeviceSnapshot>,
) -> CategoryDiff {
    let incoming: BTreeMap<u32, DeviceSnapshot> = incoming
        .into_iter()
        .filter(|s| s.kind == kind)
        .map(|s| (s.id, s))
        .collect();

    let mut removed: Vec<DeviceKey> = known
        .keys()
        .filter(|k| k.kind == kind && !incoming.contains_key(&k.id))
        .copied()
        .collect();
    removed.sort_unstable();

    let mut diff = CategoryDiff {
        removed,
        ..CategoryDiff::default()
    };

    for (id, snapshot) in incoming {
        match known.get(&DeviceKey::new(kind, id)) {
            None => diff.added.push(snapshot),
            Some(prev) if prev.snapshot != snapshot => diff.updated.push(snapshot),
            Some(_) => diff.unchanged += 1,
        }
    }

    diff
}

/// Remove everything of `kind`; used when the category is disabled.
pub(crate) fn drop_category(kind: DeviceKind, known: &HashMap<DeviceKey, Known>) -> CategoryDiff {
    let mut removed: Vec<DeviceKey> = known.keys().filter(|k| k.kind == kind).copied().collect();
    removed.sort_unstable();
    CategoryDiff {
        removed,
        ..CategoryDiff::default()
    }
}
