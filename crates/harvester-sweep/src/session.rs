//! Mutable state shared by every sweep of a run.

use crate::error::Result;
use chrono::{DateTime, Utc};
use harvester_core::StorageConfig;
use harvester_store::{ProgressLedger, RecordStore};
use std::path::{Path, PathBuf};
use tracing::info;

/// The record store, the progress ledger and this run's snapshot file.
///
/// Single-threaded by construction: the controller takes it by `&mut`.
#[derive(Debug)]
pub struct HarvestSession {
    /// Deduplicated records from all runs
    pub store: RecordStore,
    /// Resume state per scan key
    pub ledger: ProgressLedger,
    snapshot_path: PathBuf,
}

impl HarvestSession {
    /// Assemble a session from already loaded state.
    #[must_use]
    pub fn new(store: RecordStore, ledger: ProgressLedger, snapshot_path: PathBuf) -> Self {
        Self {
            store,
            ledger,
            snapshot_path,
        }
    }

    /// Load prior snapshots and the ledger, and pick this run's snapshot file.
    ///
    /// # Errors
    /// Returns `StoreError::CorruptData` (via `SweepError::Store`) if any
    /// prior snapshot or the ledger is malformed.
    pub fn open(storage: &StorageConfig, id_field: &str, started_at: DateTime<Utc>) -> Result<Self> {
        let prior = RecordStore::discover(&storage.output_dir)?;
        let store = RecordStore::load(&prior, id_field)?;
        let ledger = ProgressLedger::load(&storage.ledger_path)?;
        let snapshot_path = RecordStore::snapshot_path(&storage.output_dir, started_at);

        info!(
            snapshot = %snapshot_path.display(),
            records = store.len(),
            ledger_entries = ledger.len(),
            "harvest session opened"
        );

        Ok(Self::new(store, ledger, snapshot_path))
    }

    /// File this run's records are flushed to.
    #[must_use]
    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Write the full record collection to this run's snapshot.
    pub fn flush(&mut self) -> Result<()> {
        self.store.flush(&self.snapshot_path)?;
        Ok(())
    }
}
