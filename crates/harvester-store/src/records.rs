//! Global deduplicated record collection.
//!
//! `seen_ids` is the only deduplication authority: across scan keys,
//! across sweeps and across runs. Every stored record has exactly one
//! entry in it.

use crate::error::{Result, StoreError};
use crate::{read_text, to_pretty_json, write_atomic};
use chrono::{DateTime, Utc};
use harvester_core::{record_id, Record, RecordId};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Snapshot file name prefix.
const SNAPSHOT_PREFIX: &str = "dataset";

/// Deduplicated records in insertion order.
#[derive(Debug, Clone)]
pub struct RecordStore {
    id_field: String,
    seen_ids: HashSet<RecordId>,
    records: Vec<Record>,
    /// Records were inserted since the last flush
    dirty: bool,
}

impl RecordStore {
    /// Create an empty store keyed on `id_field`.
    #[must_use]
    pub fn new(id_field: impl Into<String>) -> Self {
        Self {
            id_field: id_field.into(),
            seen_ids: HashSet::new(),
            records: Vec::new(),
            dirty: false,
        }
    }

    /// List prior snapshots (`dataset*.json`) in `dir`, oldest first.
    ///
    /// A missing directory means a first run and yields no paths.
    pub fn discover(dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            debug!(dir = %dir.display(), "no snapshot directory yet");
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_snapshot = path.is_file()
                && path.extension().and_then(|s| s.to_str()) == Some("json")
                && path
                    .file_name()
                    .and_then(|s| s.to_str())
                    .is_some_and(|name| name.starts_with(SNAPSHOT_PREFIX));
            if is_snapshot {
                paths.push(path);
            }
        }

        // Timestamped names sort chronologically
        paths.sort();
        Ok(paths)
    }

    /// Load and union the records of every document in `paths`.
    ///
    /// Exact duplicates collapse to one entry. When two documents hold
    /// different records under the same id, the later document wins and
    /// the replacement keeps the earlier record's position. Records without
    /// an id cannot be deduplicated and are dropped.
    ///
    /// # Errors
    /// Returns `StoreError::CorruptData` if any document is not a JSON
    /// array of objects. A partial load is never returned.
    pub fn load(paths: &[PathBuf], id_field: impl Into<String>) -> Result<Self> {
        let mut store = Self::new(id_field);
        let mut positions: HashMap<RecordId, usize> = HashMap::new();
        let mut exact_duplicates = 0usize;
        let mut conflicts = 0usize;
        let mut without_id = 0usize;

        for path in paths {
            for record in Self::read_document(path)? {
                let Some(id) = record_id(&record, &store.id_field) else {
                    without_id += 1;
                    continue;
                };

                match positions.get(&id).copied() {
                    Some(idx) if store.records[idx] == record => exact_duplicates += 1,
                    Some(idx) => {
                        conflicts += 1;
                        warn!(
                            id = %id,
                            path = %path.display(),
                            "conflicting copies of record, keeping the newer one"
                        );
                        store.records[idx] = record;
                    }
                    None => {
                        positions.insert(id.clone(), store.records.len());
                        store.seen_ids.insert(id);
                        store.records.push(record);
                    }
                }
            }
        }

        if without_id > 0 {
            warn!(
                count = without_id,
                id_field = %store.id_field,
                "dropped prior records without an id"
            );
        }

        info!(
            files = paths.len(),
            records = store.records.len(),
            exact_duplicates,
            conflicts,
            "loaded prior records"
        );

        Ok(store)
    }

    fn read_document(path: &Path) -> Result<Vec<Record>> {
        let contents = read_text(path)?;
        let value: Value = serde_json::from_str(&contents)
            .map_err(|e| StoreError::corrupt(path, format!("invalid JSON: {e}")))?;

        let Value::Array(items) = value else {
            return Err(StoreError::corrupt(path, "expected a JSON array of records"));
        };

        items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| match item {
                Value::Object(record) => Ok(record),
                other => Err(StoreError::corrupt(
                    path,
                    format!("element {idx} is not an object: {other}"),
                )),
            })
            .collect()
    }

    /// Identifier of `record` under this store's id field.
    #[must_use]
    pub fn id_of(&self, record: &Record) -> Option<RecordId> {
        record_id(record, &self.id_field)
    }

    /// Field records are deduplicated on.
    #[must_use]
    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    /// Whether `id` has been seen in this or any prior run.
    #[must_use]
    pub fn contains(&self, id: &RecordId) -> bool {
        self.seen_ids.contains(id)
    }

    /// Insert `record` if its id is new.
    ///
    /// Returns `false` for already-seen records and records without an id.
    pub fn insert(&mut self, record: Record) -> bool {
        let Some(id) = self.id_of(&record) else {
            return false;
        };
        if !self.seen_ids.insert(id) {
            return false;
        }
        self.records.push(record);
        self.dirty = true;
        true
    }

    /// Number of unique records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in insertion order.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Records were inserted since the last flush.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write the whole collection to `path` in insertion order.
    pub fn flush(&mut self, path: &Path) -> Result<()> {
        let contents = to_pretty_json(&self.records)?;
        write_atomic(path, &contents)?;
        self.dirty = false;

        debug!(path = %path.display(), records = self.records.len(), "flushed record snapshot");
        Ok(())
    }

    /// Fresh snapshot path for a run starting at `started_at`.
    ///
    /// Never returns an existing file, so prior snapshots are not overwritten.
    #[must_use]
    pub fn snapshot_path(dir: &Path, started_at: DateTime<Utc>) -> PathBuf {
        let stamp = started_at.format("%y_%m_%d_%H_%M_%S");
        let base = dir.join(format!("{SNAPSHOT_PREFIX}_{stamp}.json"));
        if !base.exists() {
            return base;
        }

        (1u32..)
            .map(|n| dir.join(format!("{SNAPSHOT_PREFIX}_{stamp}_{n}.json")))
            .find(|candidate| !candidate.exists())
            .unwrap_or(base)
    }
}
