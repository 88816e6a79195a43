//! Graph operation errors.
//!
//! These are bounded and stable: every failure is a domain/refusal state
//! reported synchronously to the caller of the offending operation, and the
//! graph is never left partially mutated.

use thiserror::Error;

use crate::domain::RefKind;
use crate::identity::RecordId;

/// Whether retrying this operation may succeed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Transience {
    /// Retry will never help without changing inputs/state.
    Permanent,
    /// Retry may help (transient contention/outage).
    Retryable,
}

impl Transience {
    pub fn is_retryable(self) -> bool {
        matches!(self, Transience::Retryable)
    }
}

/// What we know about side effects when an error is returned.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Effect {
    /// Definitely no side effects occurred.
    None,
    /// Side effects definitely occurred.
    Some,
}

/// Canonical error enum for graph operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GraphError {
    /// Id was never registered, or the record has already finalized.
    /// A finalized record accepts no further edges in either direction.
    #[error("record {id} is not live (never registered or already finalized)")]
    UnknownRecord { id: RecordId },

    /// Remove of an edge that does not currently exist.
    #[error("no {kind} edge {from} -> {to}")]
    EdgeNotFound {
        from: RecordId,
        to: RecordId,
        kind: RefKind,
    },

    /// Strong lookup of a target that has already finalized.
    ///
    /// This is a logic error: a strong lookup asserts the target outlives
    /// the holder by program design. Callers should treat it as fatal, not
    /// retry or swallow it.
    #[error("strong lookup {from} -> {to} dangles: target already finalized")]
    DanglingReference { from: RecordId, to: RecordId },
}

impl GraphError {
    pub fn transience(&self) -> Transience {
        // Pure domain/input failures; retrying the same call cannot succeed.
        Transience::Permanent
    }

    pub fn effect(&self) -> Effect {
        // Operations validate fully before mutating.
        Effect::None
    }
}
