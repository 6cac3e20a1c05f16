// ── Room index ──

use std::collections::HashMap;

use crestron_api::RoomRecord;

/// Room id to display name. Replaced wholesale on every room sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomIndex {
    names: HashMap<u32, String>,
}

impl RoomIndex {
    pub fn from_records(records: &[RoomRecord]) -> Self {
        records
            .iter()
            .map(|r| (r.id, r.name.trim().to_owned()))
            .collect()
    }

    pub fn name(&self, id: u32) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// Resolve an optional room id.
    pub fn resolve(&self, id: Option<u32>) -> Option<String> {
        id.and_then(|id| self.name(id)).map(str::to_owned)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Rooms sorted by name.
    pub fn sorted(&self) -> Vec<(u32, &str)> {
        let mut rooms: Vec<_> = self.names.iter().map(|(id, n)| (*id, n.as_str())).collect();
        rooms.sort_by(|a, b| a.1.cmp(b.1).then(a.0.cmp(&b.0)));
        rooms
    }

    /// Ids whose name differs in `next`, or that vanished from it.
    pub fn changed_in(&self, next: &RoomIndex) -> Vec<u32> {
        self.names
            .iter()
            .filter(|(id, name)| next.name(**id) != Some(name.as_str()))
            .map(|(id, _)| *id)
            .collect()
    }
}

impl FromIterator<(u32, String)> for RoomIndex {
    fn from_iter<I: IntoIterator<Item = (u32, String)>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}
