//! Layer 1: Identity atom
//!
//! RecordId: per-graph record identity

use std::fmt;

use serde::{Deserialize, Serialize};

/// Record identifier.
///
/// Assigned sequentially by the owning `ReferenceGraph`; never reused, so
/// iteration and finalization order are deterministic. Only the graph mints
/// new ids (pub(crate) constructor).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(u64);

impl RecordId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_order_by_creation_sequence() {
        let a = RecordId::new(1);
        let b = RecordId::new(2);
        assert!(a < b);
        assert_eq!(a.value(), 1);
    }
}
