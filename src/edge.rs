//! Layer 4: Edges
//!
//! EdgeKey: identity tuple (from, to, kind)
//! EdgeStore: counted multiset of typed edges
//!
//! Edges are counts, not sets: inserting the same key twice yields
//! multiplicity 2, and removal takes one instance at a time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::RefKind;
use crate::identity::RecordId;

/// Edge identity tuple.
///
/// Ordered by (from, to, kind) so iteration groups a record's outgoing
/// edges together.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeKey {
    pub from: RecordId,
    pub to: RecordId,
    pub kind: RefKind,
}

impl EdgeKey {
    pub fn new(from: RecordId, to: RecordId, kind: RefKind) -> Self {
        Self { from, to, kind }
    }
}

/// Snapshot form of one store entry.
#[derive(Clone, Serialize, Deserialize)]
struct EdgeEntry {
    from: RecordId,
    to: RecordId,
    kind: RefKind,
    multiplicity: u32,
}

/// Canonical edge store.
///
/// Serialized as a flat entry list so snapshots stay map-key-free.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(from = "Vec<EdgeEntry>", into = "Vec<EdgeEntry>")]
pub struct EdgeStore {
    by_key: BTreeMap<EdgeKey, u32>,
}

impl EdgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one instance of the edge; returns the new multiplicity.
    pub fn insert(&mut self, key: EdgeKey) -> u32 {
        let multiplicity = self.by_key.entry(key).or_insert(0);
        *multiplicity += 1;
        *multiplicity
    }

    /// Remove one instance of the edge.
    ///
    /// Returns the remaining multiplicity, or `None` if no such edge
    /// exists. The key disappears from the store when it reaches zero.
    pub fn remove_one(&mut self, key: &EdgeKey) -> Option<u32> {
        match self.by_key.get_mut(key) {
            Some(multiplicity) if *multiplicity > 1 => {
                *multiplicity -= 1;
                Some(*multiplicity)
            }
            Some(_) => {
                self.by_key.remove(key);
                Some(0)
            }
            None => None,
        }
    }

    /// Drain every edge originating at `from`, all kinds.
    pub fn remove_all_from(&mut self, from: RecordId) -> Vec<(EdgeKey, u32)> {
        let keys: Vec<EdgeKey> = self
            .by_key
            .keys()
            .filter(|key| key.from == from)
            .copied()
            .collect();
        keys.into_iter()
            .map(|key| {
                let multiplicity = self.by_key.remove(&key).unwrap_or(0);
                (key, multiplicity)
            })
            .collect()
    }

    pub fn multiplicity(&self, key: &EdgeKey) -> u32 {
        self.by_key.get(key).copied().unwrap_or(0)
    }

    pub fn contains(&self, key: &EdgeKey) -> bool {
        self.by_key.contains_key(key)
    }

    /// Number of distinct edge keys.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Total multiplicity across all keys.
    pub fn total(&self) -> u64 {
        self.by_key.values().map(|m| u64::from(*m)).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EdgeKey, u32)> {
        self.by_key.iter().map(|(key, m)| (key, *m))
    }
}

impl From<Vec<EdgeEntry>> for EdgeStore {
    fn from(entries: Vec<EdgeEntry>) -> Self {
        let mut store = Self::default();
        for entry in entries {
            let key = EdgeKey::new(entry.from, entry.to, entry.kind);
            *store.by_key.entry(key).or_insert(0) += entry.multiplicity;
        }
        store
    }
}

impl From<EdgeStore> for Vec<EdgeEntry> {
    fn from(store: EdgeStore) -> Self {
        store
            .by_key
            .into_iter()
            .map(|(key, multiplicity)| EdgeEntry {
                from: key.from,
                to: key.to,
                kind: key.kind,
                multiplicity,
            })
            .collect()
    }
}
