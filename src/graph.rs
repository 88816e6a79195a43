//! Layer 5: Reference graph
//!
//! The single source of truth for records and typed edges.
//!
//! INVARIANT: each RecordId maps to either a live record or a finalized
//! marker. A live record's owning count equals the total multiplicity of
//! owning edges targeting it.
//!
//! A 1 -> 0 owning-count transition finalizes the record immediately, and
//! finalization cascades: dropping the record's outgoing owning edges may
//! push other counts to zero, all within the same synchronous pass, each
//! hook invoked exactly once, owner before owned.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::domain::RefKind;
use crate::edge::{EdgeKey, EdgeStore};
use crate::error::GraphError;
use crate::identity::RecordId;
use crate::record::{FinalizeHook, FinalizedRecord, ObjectRecord};

/// Record entry stored by id.
#[derive(Debug, Serialize, Deserialize)]
enum RecordEntry {
    Live(Box<ObjectRecord>),
    Finalized(Box<FinalizedRecord>),
}

/// Ownership-and-lifetime tracker over a typed reference graph.
///
/// Single-threaded and synchronous: every operation, including any
/// finalization cascade it triggers, runs to completion before returning.
/// Operations validate fully before mutating, so a failed call leaves the
/// graph untouched.
///
/// Snapshots: the graph serializes without hooks (a reloaded graph carries
/// no-op hooks) and preserves records, edges, counts, and the finalization
/// order.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ReferenceGraph {
    records: BTreeMap<RecordId, RecordEntry>,
    edges: EdgeStore,
    next_id: u64,
    finalized_order: Vec<RecordId>,
}

impl ReferenceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a new record at owning count zero. Never fails.
    pub fn create(&mut self, hook: FinalizeHook) -> RecordId {
        self.register(None, hook)
    }

    /// Register a new record with a human label for traces and markers.
    pub fn create_with_label(&mut self, label: impl Into<String>, hook: FinalizeHook) -> RecordId {
        self.register(Some(label.into()), hook)
    }

    fn register(&mut self, label: Option<String>, hook: FinalizeHook) -> RecordId {
        let id = RecordId::new(self.next_id);
        self.next_id += 1;
        debug!(%id, label = label.as_deref().unwrap_or(""), "record created");
        let record = ObjectRecord::new(id, label, hook);
        self.records.insert(id, RecordEntry::Live(Box::new(record)));
        id
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn get_live(&self, id: RecordId) -> Option<&ObjectRecord> {
        match self.records.get(&id) {
            Some(RecordEntry::Live(record)) => Some(record.as_ref()),
            _ => None,
        }
    }

    pub fn get_finalized(&self, id: RecordId) -> Option<&FinalizedRecord> {
        match self.records.get(&id) {
            Some(RecordEntry::Finalized(marker)) => Some(marker.as_ref()),
            _ => None,
        }
    }

    /// Whether the id was ever registered (live or finalized).
    pub fn contains(&self, id: RecordId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn is_finalized(&self, id: RecordId) -> Result<bool, GraphError> {
        match self.records.get(&id) {
            Some(RecordEntry::Live(_)) => Ok(false),
            Some(RecordEntry::Finalized(_)) => Ok(true),
            None => Err(GraphError::UnknownRecord { id }),
        }
    }

    /// Current owning count. Zero for finalized records; a never-registered
    /// id is an error.
    pub fn owning_count(&self, id: RecordId) -> Result<u32, GraphError> {
        match self.records.get(&id) {
            Some(RecordEntry::Live(record)) => Ok(record.owning_count()),
            Some(RecordEntry::Finalized(_)) => Ok(0),
            None => Err(GraphError::UnknownRecord { id }),
        }
    }

    pub fn live_count(&self) -> usize {
        self.records
            .values()
            .filter(|entry| matches!(entry, RecordEntry::Live(_)))
            .count()
    }

    pub fn finalized_count(&self) -> usize {
        self.finalized_order.len()
    }

    /// Number of distinct edge keys currently extant.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge_multiplicity(&self, from: RecordId, to: RecordId, kind: RefKind) -> u32 {
        self.edges.multiplicity(&EdgeKey::new(from, to, kind))
    }

    pub fn iter_live(&self) -> impl Iterator<Item = (RecordId, &ObjectRecord)> {
        self.records.iter().filter_map(|(id, entry)| match entry {
            RecordEntry::Live(record) => Some((*id, record.as_ref())),
            _ => None,
        })
    }

    pub fn iter_finalized(&self) -> impl Iterator<Item = (RecordId, &FinalizedRecord)> {
        self.records.iter().filter_map(|(id, entry)| match entry {
            RecordEntry::Finalized(marker) => Some((*id, marker.as_ref())),
            _ => None,
        })
    }

    /// All extant edges originating at `id`, with multiplicity.
    pub fn edges_from(&self, id: RecordId) -> Vec<(EdgeKey, u32)> {
        self.edges
            .iter()
            .filter(|(key, _)| key.from == id)
            .map(|(key, multiplicity)| (*key, multiplicity))
            .collect()
    }

    /// All extant edges targeting `id`, with multiplicity.
    pub fn edges_to(&self, id: RecordId) -> Vec<(EdgeKey, u32)> {
        self.edges
            .iter()
            .filter(|(key, _)| key.to == id)
            .map(|(key, multiplicity)| (*key, multiplicity))
            .collect()
    }

    /// Ids in the order they finalized. Append-only.
    pub fn finalization_order(&self) -> &[RecordId] {
        &self.finalized_order
    }

    fn require_live(&self, id: RecordId) -> Result<&ObjectRecord, GraphError> {
        self.get_live(id).ok_or(GraphError::UnknownRecord { id })
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Weak read of `to`: present while the target is live, absent once it
    /// has finalized or was never registered. Never fails.
    pub fn resolve_weak(&self, from: RecordId, to: RecordId) -> Option<&ObjectRecord> {
        let resolved = self.get_live(to);
        trace!(%from, %to, present = resolved.is_some(), "weak lookup");
        resolved
    }

    /// Strong (unowned-style) read of `to`: the target is assumed to outlive
    /// the holder. A finalized target is a `DanglingReference` logic error.
    pub fn resolve_strong(
        &self,
        from: RecordId,
        to: RecordId,
    ) -> Result<&ObjectRecord, GraphError> {
        match self.records.get(&to) {
            Some(RecordEntry::Live(record)) => Ok(record.as_ref()),
            Some(RecordEntry::Finalized(_)) => Err(GraphError::DanglingReference { from, to }),
            None => Err(GraphError::UnknownRecord { id: to }),
        }
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Add one edge instance. Not idempotent: repeated adds raise the
    /// multiplicity, and owning adds raise the target's count each time.
    pub fn add_edge(
        &mut self,
        from: RecordId,
        to: RecordId,
        kind: RefKind,
    ) -> Result<(), GraphError> {
        self.require_live(from)?;
        self.require_live(to)?;

        if kind.is_owning() {
            if let Some(RecordEntry::Live(record)) = self.records.get_mut(&to) {
                record.increment_owning();
            }
        }
        let multiplicity = self.edges.insert(EdgeKey::new(from, to, kind));
        debug!(%from, %to, kind = kind.as_str(), multiplicity, "edge added");
        Ok(())
    }

    /// Remove one edge instance. Removing the last owning reference to a
    /// record finalizes it immediately, cascading as needed.
    pub fn remove_edge(
        &mut self,
        from: RecordId,
        to: RecordId,
        kind: RefKind,
    ) -> Result<(), GraphError> {
        self.require_live(from)?;
        self.require_live(to)?;
        let key = EdgeKey::new(from, to, kind);
        if !self.edges.contains(&key) {
            return Err(GraphError::EdgeNotFound { from, to, kind });
        }

        let remaining = self.edges.remove_one(&key).unwrap_or(0);
        debug!(%from, %to, kind = kind.as_str(), remaining, "edge removed");

        if kind.is_owning() {
            let reached_zero = match self.records.get_mut(&to) {
                Some(RecordEntry::Live(record)) => record.decrement_owning(1) == 0,
                _ => false,
            };
            if reached_zero {
                self.finalize_cascade(to);
            }
        }
        Ok(())
    }

    /// Drop the caller's external interest in a live record.
    ///
    /// Models a last external (stack) reference going away: if nothing owns
    /// the record, it finalizes now (with cascade) and `true` is returned;
    /// if owners remain it stays live and `false` is returned.
    pub fn collect(&mut self, id: RecordId) -> Result<bool, GraphError> {
        let owned = self.require_live(id)?.owning_count();
        if owned > 0 {
            return Ok(false);
        }
        self.finalize_cascade(id);
        Ok(true)
    }

    /// Collect every live zero-count record, in id order.
    ///
    /// Returns the number of records finalized, cascade victims included.
    /// Records held in an owning cycle keep each other's counts above zero
    /// and are untouched.
    pub fn sweep(&mut self) -> usize {
        let before = self.finalized_order.len();
        loop {
            let next = self.records.iter().find_map(|(id, entry)| match entry {
                RecordEntry::Live(record) if record.owning_count() == 0 => Some(*id),
                _ => None,
            });
            match next {
                Some(id) => self.finalize_cascade(id),
                None => break,
            }
        }
        let swept = self.finalized_order.len() - before;
        if swept > 0 {
            info!(swept, "sweep finalized unowned records");
        }
        swept
    }

    // =========================================================================
    // Finalization
    // =========================================================================

    /// Finalize `root` and everything its owning edges transitively kept
    /// alive, in discovery order. Every record whose count reaches zero
    /// during the pass finalizes before the pass returns; none twice.
    fn finalize_cascade(&mut self, root: RecordId) {
        let mut queue = VecDeque::from([root]);
        while let Some(id) = queue.pop_front() {
            self.finalize_one(id, &mut queue);
        }
    }

    fn finalize_one(&mut self, id: RecordId, queue: &mut VecDeque<RecordId>) {
        let record = match self.records.remove(&id) {
            Some(RecordEntry::Live(record)) => *record,
            Some(entry) => {
                self.records.insert(id, entry);
                return;
            }
            None => return,
        };
        let (label, hook) = record.into_parts();
        let seq = self.finalized_order.len() as u64;
        self.finalized_order.push(id);
        let marker = FinalizedRecord { id, label, seq };
        info!(%id, label = marker.label.as_deref().unwrap_or(""), seq, "record finalized");

        // The record's outgoing edges die with it; owning targets lose one
        // count per multiplicity and join the cascade at zero.
        for (key, multiplicity) in self.edges.remove_all_from(id) {
            if key.kind.is_owning() {
                if let Some(RecordEntry::Live(target)) = self.records.get_mut(&key.to) {
                    if target.decrement_owning(multiplicity) == 0 {
                        queue.push_back(key.to);
                    }
                }
            }
        }

        hook(&marker);
        self.records
            .insert(id, RecordEntry::Finalized(Box::new(marker)));
    }
}
