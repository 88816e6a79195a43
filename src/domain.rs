//! Layer 2: Domain enums
//!
//! RefKind: owning, weak_lookup, strong_lookup

use std::fmt;

use serde::{Deserialize, Serialize};

/// Reference kind carried by an edge.
///
/// Only `Owning` keeps its target alive. The two lookup kinds differ in how
/// a read behaves once the target is gone: weak reports absence, strong
/// treats the access as a caller bug.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    Owning,
    WeakLookup,
    StrongLookup,
}

impl RefKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owning => "owning",
            Self::WeakLookup => "weak_lookup",
            Self::StrongLookup => "strong_lookup",
        }
    }

    /// True for the kind that contributes to the target's owning count.
    pub fn is_owning(&self) -> bool {
        matches!(self, Self::Owning)
    }
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
