//! Shared fixtures for sweep integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use harvester_core::{Direction, Record, ScanKey, StorageConfig};
use harvester_fetch::{Fetcher, PageResult};
use harvester_sweep::{HarvestSession, Pacing, SweepController, SweepSettings};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const ID_FIELD: &str = "id";

type Lane = (String, Direction);

/// In-memory listing API with per-lane page scripts.
///
/// Pages past the end of a script come back empty. One-shot faults are
/// returned once for their exact (key, direction, page) and then the
/// scripted page is served.
#[derive(Default)]
pub struct ScriptedFetcher {
    pages: HashMap<Lane, Vec<Vec<Record>>>,
    endless: HashMap<Lane, Vec<Record>>,
    faults: Mutex<HashMap<(String, Direction, u32), PageResult>>,
    calls: Mutex<Vec<(String, Direction, u32)>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `pages` (page 1 first) for `key` in `direction`.
    pub fn pages(mut self, key: &ScanKey, direction: Direction, pages: Vec<Vec<Record>>) -> Self {
        self.pages.insert((key.to_string(), direction), pages);
        self
    }

    /// Serve the same rows for every page of `key` in `direction`.
    pub fn endless(mut self, key: &ScanKey, direction: Direction, rows: Vec<Record>) -> Self {
        self.endless.insert((key.to_string(), direction), rows);
        self
    }

    /// Return `result` the first time `page` is requested.
    pub fn fault_once(
        self,
        key: &ScanKey,
        direction: Direction,
        page: u32,
        result: PageResult,
    ) -> Self {
        self.faults
            .lock()
            .unwrap()
            .insert((key.to_string(), direction, page), result);
        self
    }

    pub fn calls(&self) -> Vec<(String, Direction, u32)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, key: &ScanKey, direction: Direction, page: u32) -> PageResult {
        let name = key.to_string();
        self.calls.lock().unwrap().push((name.clone(), direction, page));

        if let Some(fault) = self.faults.lock().unwrap().remove(&(name.clone(), direction, page)) {
            return fault;
        }

        let lane = (name, direction);
        if let Some(rows) = self.endless.get(&lane) {
            return PageResult::Rows(rows.clone());
        }

        let rows = self
            .pages
            .get(&lane)
            .and_then(|pages| pages.get(page as usize - 1))
            .cloned()
            .unwrap_or_default();
        PageResult::Rows(rows)
    }
}

pub fn key(value: &str) -> ScanKey {
    ScanKey::new("Country", value).unwrap()
}

pub fn record(id: &str) -> Record {
    match json!({ "id": id, "Name": format!("Company {id}") }) {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

/// One page holding a record per id.
pub fn page(ids: &[&str]) -> Vec<Record> {
    ids.iter().map(|id| record(id)).collect()
}

/// `count` pages of `per_page` records, ids prefixed with `prefix`.
pub fn numbered_pages(prefix: &str, count: usize, per_page: usize) -> Vec<Vec<Record>> {
    (0..count)
        .map(|p| {
            (0..per_page)
                .map(|r| record(&format!("{prefix}-{p}-{r}")))
                .collect()
        })
        .collect()
}

pub fn storage(dir: &Path) -> StorageConfig {
    StorageConfig {
        output_dir: dir.join("datas"),
        ledger_path: dir.join("completed_filters.json"),
        flush_every_pages: 1,
    }
}

/// Open a session as a run started `run` seconds into the test would.
pub fn open_session(dir: &Path, run: u32) -> HarvestSession {
    let started_at = Utc
        .with_ymd_and_hms(2024, 3, 1, 12, 0, run)
        .single()
        .unwrap();
    HarvestSession::open(&storage(dir), ID_FIELD, started_at).unwrap()
}

pub fn controller(fetcher: ScriptedFetcher, threshold: u32) -> SweepController<ScriptedFetcher> {
    SweepController::new(
        fetcher,
        SweepSettings {
            duplicate_page_threshold: threshold,
            flush_every_pages: 1,
        },
        Pacing::none(),
    )
}

pub fn ledger_document(dir: &Path) -> Value {
    let contents = std::fs::read_to_string(dir.join("completed_filters.json")).unwrap();
    serde_json::from_str(&contents).unwrap()
}

pub fn snapshot_document(path: &Path) -> Vec<Value> {
    let contents = std::fs::read_to_string(path).unwrap();
    serde_json::from_str(&contents).unwrap()
}

pub fn snapshots(dir: &Path) -> Vec<PathBuf> {
    harvester_store::RecordStore::discover(&dir.join("datas")).unwrap()
}

pub fn ids(session: &HarvestSession) -> Vec<String> {
    session
        .store
        .records()
        .iter()
        .filter_map(|r| session.store.id_of(r))
        .map(|id| id.to_string())
        .collect()
}
