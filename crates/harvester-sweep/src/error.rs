//! Error types for the sweep subsystem.

use thiserror::Error;

/// Failures that end a run.
///
/// Fetch faults are not here: the controller checkpoints and reports them
/// as a [`crate::SweepOutcome`].
#[derive(Debug, Error)]
pub enum SweepError {
    /// Loading or persisting the ledger or record snapshot failed
    #[error("state persistence failed: {0}")]
    Store(#[from] harvester_store::StoreError),

    /// The fetch session could not be set up
    #[error("fetch session error: {0}")]
    Fetch(#[from] harvester_fetch::FetchError),
}

/// Result type for sweep operations.
pub type Result<T> = std::result::Result<T, SweepError>;
