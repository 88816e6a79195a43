//! Layer 3: Records
//!
//! ObjectRecord: live node with an owning-reference count and a hook
//! FinalizedRecord: terminal marker left once the count reaches zero
//!
//! One id maps to either a live record or a finalized marker, never both.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::identity::RecordId;

/// One-shot cleanup callback, invoked exactly once when a record finalizes.
///
/// The hook receives the terminal marker, not the graph: a hook cannot
/// observe or mutate the graph mid-cascade.
pub type FinalizeHook = Box<dyn FnOnce(&FinalizedRecord)>;

fn noop_hook() -> FinalizeHook {
    Box::new(|_| {})
}

/// A live record: identity, optional human label, and the count of owning
/// references currently keeping it alive.
///
/// Only `ReferenceGraph` mutates the count. A 1 -> 0 transition finalizes
/// the record immediately and synchronously.
#[derive(Serialize, Deserialize)]
pub struct ObjectRecord {
    id: RecordId,
    label: Option<String>,
    owning_ref_count: u32,
    /// Not serialized: a snapshot records structure and history, not live
    /// callbacks. Deserialized records carry a no-op hook.
    #[serde(skip, default = "noop_hook")]
    hook: FinalizeHook,
}

impl ObjectRecord {
    pub(crate) fn new(id: RecordId, label: Option<String>, hook: FinalizeHook) -> Self {
        Self {
            id,
            label,
            owning_ref_count: 0,
            hook,
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn owning_count(&self) -> u32 {
        self.owning_ref_count
    }

    pub(crate) fn increment_owning(&mut self) {
        self.owning_ref_count += 1;
    }

    /// Returns the count after removal.
    pub(crate) fn decrement_owning(&mut self, by: u32) -> u32 {
        debug_assert!(
            self.owning_ref_count >= by,
            "owning count underflow on {}",
            self.id
        );
        self.owning_ref_count -= by;
        self.owning_ref_count
    }

    pub(crate) fn into_parts(self) -> (Option<String>, FinalizeHook) {
        (self.label, self.hook)
    }
}

impl fmt::Debug for ObjectRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRecord")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("owning_ref_count", &self.owning_ref_count)
            .finish_non_exhaustive()
    }
}

/// Terminal marker replacing a live record at finalization.
///
/// `seq` is the record's position in the graph's finalization order.
/// Nothing moves a record back out of this state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedRecord {
    pub id: RecordId,
    pub label: Option<String>,
    pub seq: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn count_arithmetic() {
        let mut record = ObjectRecord::new(RecordId::new(1), None, noop_hook());
        assert_eq!(record.owning_count(), 0);
        record.increment_owning();
        record.increment_owning();
        assert_eq!(record.decrement_owning(1), 1);
        assert_eq!(record.decrement_owning(1), 0);
    }

    #[test]
    fn into_parts_hands_back_the_hook() {
        let fired = Rc::new(Cell::new(false));
        let hook = {
            let fired = Rc::clone(&fired);
            Box::new(move |_: &FinalizedRecord| fired.set(true)) as FinalizeHook
        };
        let record = ObjectRecord::new(RecordId::new(2), Some("user".into()), hook);
        let (label, hook) = record.into_parts();
        assert_eq!(label.as_deref(), Some("user"));

        hook(&FinalizedRecord {
            id: RecordId::new(2),
            label,
            seq: 0,
        });
        assert!(fired.get());
    }

    #[test]
    fn snapshot_skips_the_hook() {
        let mut record = ObjectRecord::new(RecordId::new(3), Some("phone".into()), noop_hook());
        record.increment_owning();

        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("hook"), "{json}");

        let reloaded: ObjectRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(reloaded.id(), record.id());
        assert_eq!(reloaded.label(), Some("phone"));
        assert_eq!(reloaded.owning_count(), 1);
    }
}
