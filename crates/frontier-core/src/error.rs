use thiserror::Error;

/// The closed error taxonomy for this crate. No error is ever swallowed: every fallible
/// operation returns one of these, and the knowledge base is saved (best-effort) on every
/// exceptional exit path from a learner's `learn()` before the error is returned.
#[derive(Debug, Error)]
pub enum Error {
    /// The persisted file's `DATA_VERSION` did not match, or its `N` disagreed with the
    /// in-memory ground-set size. Fatal to this load; the caller may start fresh.
    #[error("state file version/N mismatch: {0}")]
    StateVersionMismatch(String),

    /// Decompression or JSON parsing failed, or the codec hit an unrecognized type tag.
    /// Fatal to this load; the in-memory state is left untouched.
    #[error("state file is corrupt: {0}")]
    StateCorrupt(String),

    /// The user-supplied predicate returned an error when queried.
    #[error("oracle predicate failed: {0}")]
    OracleFailure(String),

    /// The SAT/MILP solver reported a problem that should have been satisfiable by
    /// construction (a caller bug or a constraint mis-encoding, not a modeling outcome).
    #[error("solver reported infeasible where satisfiable was expected: {0}")]
    SolverInfeasible(String),

    /// Learning was cancelled via the cooperative interrupt flag (see the crate's
    /// concurrency notes). State has already been saved by the time this is returned.
    #[error("learning was interrupted")]
    Interrupt,

    /// A filesystem error from the persistence layer.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A `serde_json` error reading or writing the tagged-value payload.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
