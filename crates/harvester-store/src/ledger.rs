//! Durable per-scan-key resume state.
//!
//! The ledger file is a JSON object keyed by scan key string. Each value is
//! either the legacy form `true` (fully completed) or
//! `{"status": bool, "page": int, "direction": "Asc"|"Desc"}`. Completed
//! keys are written back as `{"status": true}`; everything else in object form.

use crate::error::{Result, StoreError};
use crate::{read_text, to_pretty_json, write_atomic};
use harvester_core::{Direction, ScanKey, SweepState};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Resume state for every scan key ever swept.
#[derive(Debug, Clone)]
pub struct ProgressLedger {
    path: PathBuf,
    entries: BTreeMap<String, SweepState>,
}

impl ProgressLedger {
    /// Load the ledger at `path`; a missing file is an empty ledger.
    ///
    /// # Errors
    /// Returns `StoreError::CorruptData` if the document or any entry is
    /// malformed. Entries are never silently discarded.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            debug!(path = %path.display(), "no ledger yet, starting empty");
            return Ok(Self {
                path,
                entries: BTreeMap::new(),
            });
        }

        let contents = read_text(&path)?;
        let document: Value = serde_json::from_str(&contents)
            .map_err(|e| StoreError::corrupt(&path, format!("invalid JSON: {e}")))?;
        let Value::Object(raw) = document else {
            return Err(StoreError::corrupt(&path, "expected a JSON object keyed by scan key"));
        };

        let mut entries = BTreeMap::new();
        for (key, value) in raw {
            let state = decode_entry(&value)
                .map_err(|reason| StoreError::corrupt(&path, format!("entry '{key}': {reason}")))?;
            entries.insert(key, state);
        }

        info!(
            path = %path.display(),
            entries = entries.len(),
            completed = entries.values().filter(|s| s.completed).count(),
            "loaded progress ledger"
        );

        Ok(Self { path, entries })
    }

    /// Location the ledger is saved to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resume state for `key`; unknown keys are fresh.
    #[must_use]
    pub fn state(&self, key: &ScanKey) -> SweepState {
        self.entries
            .get(&key.to_string())
            .copied()
            .unwrap_or_default()
    }

    /// Whether `key` has an entry at all.
    #[must_use]
    pub fn contains(&self, key: &ScanKey) -> bool {
        self.entries.contains_key(&key.to_string())
    }

    /// Update `key` in memory without persisting.
    pub fn set(&mut self, key: &ScanKey, state: SweepState) {
        self.entries.insert(key.to_string(), state);
    }

    /// Update `key` and persist the whole ledger before returning.
    pub fn checkpoint(&mut self, key: &ScanKey, state: SweepState) -> Result<()> {
        self.set(key, state);
        self.save()
    }

    /// Drop the entry stored under `key`, returning it.
    pub fn remove(&mut self, key: &str) -> Option<SweepState> {
        self.entries.remove(key)
    }

    /// All entries, ordered by key string.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &SweepState)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ledger has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the ledger to its path.
    pub fn save(&self) -> Result<()> {
        let document: Map<String, Value> = self
            .entries
            .iter()
            .map(|(key, state)| (key.clone(), encode_entry(state)))
            .collect();

        write_atomic(&self.path, &to_pretty_json(&document)?)?;
        debug!(path = %self.path.display(), entries = self.entries.len(), "saved progress ledger");
        Ok(())
    }
}

fn encode_entry(state: &SweepState) -> Value {
    if state.completed {
        json!({ "status": true })
    } else {
        json!({
            "status": false,
            "page": state.next_page,
            "direction": state.direction.as_wire(),
        })
    }
}

fn decode_entry(value: &Value) -> std::result::Result<SweepState, String> {
    let fields = match value {
        Value::Bool(true) => return Ok(SweepState::finished()),
        Value::Bool(false) => return Ok(SweepState::fresh()),
        Value::Object(fields) => fields,
        other => return Err(format!("expected a boolean or an object, got {other}")),
    };

    let completed = match fields.get("status") {
        None => false,
        Some(Value::Bool(b)) => *b,
        Some(other) => return Err(format!("status must be a boolean, got {other}")),
    };
    if completed {
        return Ok(SweepState::finished());
    }

    let page = match fields.get("page") {
        None => 1,
        Some(v) => v
            .as_u64()
            .filter(|p| *p >= 1)
            .and_then(|p| u32::try_from(p).ok())
            .ok_or_else(|| format!("page must be a positive integer, got {v}"))?,
    };

    let direction = match fields.get("direction") {
        None => Direction::Ascending,
        Some(Value::String(s)) if s == "Asc" => Direction::Ascending,
        Some(Value::String(s)) if s == "Desc" => Direction::Descending,
        Some(other) => return Err(format!("direction must be \"Asc\" or \"Desc\", got {other}")),
    };

    Ok(SweepState::at(direction, page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn key(value: &str) -> ScanKey {
        ScanKey::new("Country", value).expect("valid key")
    }

    fn ledger_with(contents: &str) -> (TempDir, PathBuf) {
        let tmp = TempDir::new().expect("create temp dir");
        let path = tmp.path().join("completed_filters.json");
        fs::write(&path, contents).expect("write ledger");
        (tmp, path)
    }

    #[test]
    fn test_missing_file_is_empty_ledger() {
        let tmp = TempDir::new().expect("create temp dir");
        let ledger = ProgressLedger::load(tmp.path().join("absent.json")).expect("load");
        assert!(ledger.is_empty());
        assert_eq!(ledger.state(&key("Colombia")), SweepState::fresh());
    }

    #[test]
    fn test_legacy_true_equals_completed_object() {
        let (_tmp, path) = ledger_with(
            r#"{"Country:Colombia": true, "Country:Peru": {"status": true}}"#,
        );
        let ledger = ProgressLedger::load(&path).expect("load");

        assert_eq!(ledger.state(&key("Colombia")), ledger.state(&key("Peru")));
        assert!(ledger.state(&key("Colombia")).completed);
    }

    #[test]
    fn test_object_form_decodes() {
        let (_tmp, path) = ledger_with(
            r#"{
                "Country:Chile": {"status": false, "page": 12, "direction": "Desc"},
                "Country:Peru": {"status": false},
                "Country:Bolivia": false
            }"#,
        );
        let ledger = ProgressLedger::load(&path).expect("load");

        assert_eq!(
            ledger.state(&key("Chile")),
            SweepState::at(Direction::Descending, 12)
        );
        assert_eq!(ledger.state(&key("Peru")), SweepState::fresh());
        assert_eq!(ledger.state(&key("Bolivia")), SweepState::fresh());
    }

    #[test]
    fn test_malformed_entries_are_corrupt() {
        for bad in [
            r#"[1, 2]"#,
            r#"{"Country:Chile": {"status": false, "page": 0}}"#,
            r#"{"Country:Chile": {"status": false, "page": -3}}"#,
            r#"{"Country:Chile": {"status": false, "direction": "Sideways"}}"#,
            r#"{"Country:Chile": {"status": "yes"}}"#,
            r#"{"Country:Chile": 5}"#,
            r#"{"Country:Chile": "#,
        ] {
            let (_tmp, path) = ledger_with(bad);
            let err = ProgressLedger::load(&path).expect_err(bad);
            assert!(matches!(err, StoreError::CorruptData { .. }), "{bad}");
        }
    }

    #[test]
    fn test_non_utf8_ledger_is_corrupt() {
        let tmp = TempDir::new().expect("create temp dir");
        let path = tmp.path().join("completed_filters.json");
        fs::write(&path, b"{\"Country:FR\": \xc3}").expect("write ledger");

        let err = ProgressLedger::load(&path).expect_err("invalid UTF-8");
        assert!(matches!(err, StoreError::CorruptData { .. }));
    }

    #[test]
    fn test_checkpoint_writes_object_and_terminal_forms() {
        let tmp = TempDir::new().expect("create temp dir");
        let path = tmp.path().join("completed_filters.json");
        let mut ledger = ProgressLedger::load(&path).expect("load");

        ledger
            .checkpoint(&key("Chile"), SweepState::at(Direction::Ascending, 4))
            .expect("checkpoint partial");
        ledger
            .checkpoint(&key("Peru"), SweepState::finished())
            .expect("checkpoint finished");

        let written: Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("parse");
        assert_eq!(
            written,
            json!({
                "Country:Chile": {"status": false, "page": 4, "direction": "Asc"},
                "Country:Peru": {"status": true}
            })
        );
    }

    #[test]
    fn test_save_preserves_unconfigured_and_legacy_keys() {
        let (_tmp, path) = ledger_with(r#"{"Region:Asia": true}"#);
        let mut ledger = ProgressLedger::load(&path).expect("load");
        ledger
            .checkpoint(&key("Chile"), SweepState::handoff())
            .expect("checkpoint");

        let reloaded = ProgressLedger::load(&path).expect("reload");
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.state(&"Region:Asia".parse().expect("key")).completed);
        assert_eq!(reloaded.state(&key("Chile")), SweepState::handoff());
    }

    #[test]
    fn test_remove_entry() {
        let (_tmp, path) = ledger_with(r#"{"Country:Chile": true}"#);
        let mut ledger = ProgressLedger::load(&path).expect("load");

        assert!(ledger.contains(&key("Chile")));
        assert_eq!(ledger.remove("Country:Chile"), Some(SweepState::finished()));
        assert!(!ledger.contains(&key("Chile")));
        assert_eq!(ledger.remove("Country:Chile"), None);
    }
}
