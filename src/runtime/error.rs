use thiserror::Error;

use crate::graph::fault::Fault;

/// Errors produced by the chaining runtime.
///
/// `Clone` and `PartialEq` are required: one failed computation can have any
/// number of observers, and each receives its own copy of the error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChainError {
    /// A handle was presented to a realm that never produced it.
    #[error("unmapped handle: {0}")]
    UnmappedHandle(String),

    /// A value outside the supported taxonomy was offered for wrapping.
    #[error("unsupported value kind: {0}")]
    UnsupportedValueKind(String),

    /// Member access on a value that declares no shape.
    #[error("not navigable: {0}")]
    NotNavigable(String),

    /// Call dispatch on a value that is not a function.
    #[error("not callable: {0}")]
    NotCallable(String),

    /// Wrapping refused because a declared member name collides with the
    /// settlement protocol under the rejecting alias policy.
    #[error("reserved member name: {0}")]
    ReservedName(String),

    /// A raw value was paired with a second live handle. Embedder misuse;
    /// the first pairing stays authoritative.
    #[error("identity registry conflict: {0}")]
    RegistryConflict(String),

    /// A failure raised by the object graph, carried through unchanged.
    #[error(transparent)]
    Forwarded(#[from] Fault),

    /// An await ran the job queue dry while the computation was still
    /// pending. The computation itself is untouched; a later completion
    /// followed by a fresh await succeeds.
    #[error("stalled: {0}")]
    Stalled(String),

    /// A single await exceeded the configured job budget.
    #[error("job budget exhausted: {0}")]
    BudgetExhausted(String),
}
