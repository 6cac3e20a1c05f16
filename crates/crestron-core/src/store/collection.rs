// ── Generic reactive entity collection ──
//
// Lock-free concurrent storage with O(1) lookups and push-based
// change notification via `watch` channels.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

/// A lock-free, reactive collection keyed by `K`.
///
/// Contents only ever change through [`apply`](Self::apply), which folds a
/// whole batch into a single broadcast so readers never observe half a
/// cycle.
pub(crate) struct EntityCollection<K, T>
where
    K: Eq + Hash + Ord + Clone + Send + Sync + 'static,
    T: PartialEq + Send + Sync + 'static,
{
    by_key: DashMap<K, Arc<T>>,

    /// Key-ordered snapshot, rebuilt on every effective change.
    snapshot: watch::Sender<Arc<Vec<Arc<T>>>>,
}

impl<K, T> EntityCollection<K, T>
where
    K: Eq + Hash + Ord + Clone + Send + Sync + 'static,
    T: PartialEq + Send + Sync + 'static,
{
    pub(crate) fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            by_key: DashMap::new(),
            snapshot,
        }
    }

    /// Replace the whole contents with `items`, broadcasting at most once.
    ///
    /// Unchanged entities keep their existing `Arc`. Returns `true` if
    /// anything was inserted, replaced or removed.
    pub(crate) fn apply(&self, items: Vec<(K, T)>) -> bool {
        let incoming: HashSet<K> = items.iter().map(|(k, _)| k.clone()).collect();
        let mut changed = false;

        for (key, entity) in items {
            let same = self
                .by_key
                .get(&key)
                .is_some_and(|existing| **existing == entity);
            if !same {
                self.by_key.insert(key, Arc::new(entity));
                changed = true;
            }
        }

        self.by_key.retain(|key, _| {
            let keep = incoming.contains(key);
            changed |= !keep;
            keep
        });

        if changed {
            self.publish();
        }
        changed
    }

    pub(crate) fn get(&self, key: &K) -> Option<Arc<T>> {
        self.by_key.get(key).map(|r| Arc::clone(r.value()))
    }

    /// Get the current snapshot (cheap `Arc` clone).
    pub(crate) fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes via a `watch::Receiver`.
    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<T>>>> {
        self.snapshot.subscribe()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_key.len()
    }

    /// Rebuild the key-ordered snapshot and broadcast it.
    fn publish(&self) {
        let mut entries: Vec<(K, Arc<T>)> = self
            .by_key
            .iter()
            .map(|r| (r.key().clone(), Arc::clone(r.value())))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        let values = entries.into_iter().map(|(_, v)| v).collect();

        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }
}
