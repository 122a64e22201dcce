//! Error types for the store subsystem.

use thiserror::Error;

/// Errors that can occur while loading or persisting harvester state.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A ledger or dataset document is not well-formed.
    ///
    /// Fatal for the run: continuing would re-fetch or re-emit records.
    #[error("corrupt data in {path}: {reason}")]
    CorruptData {
        /// Offending file
        path: String,
        /// What was wrong with it
        reason: String,
    },

    /// I/O error while reading or writing state
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization failed while writing state
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn corrupt(path: &std::path::Path, reason: impl Into<String>) -> Self {
        Self::CorruptData {
            path: path.display().to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
