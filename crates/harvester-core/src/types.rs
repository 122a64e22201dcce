//! Shared types used across the harvester workspace.
//!
//! This module defines the scan key, sweep direction and resume state that
//! the ledger persists, plus the record representation the store owns.

use crate::error::HarvestError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// A harvested record: an opaque JSON object from the listing API.
pub type Record = serde_json::Map<String, Value>;

/// Deduplication key of a record.
///
/// Text and numeric ids never compare equal, so `"1"` and `1` are two
/// different records.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordId {
    /// Non-empty string id
    Text(String),
    /// Numeric id, kept as its JSON text
    Number(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) | Self::Number(s) => f.write_str(s),
        }
    }
}

/// Extract a record's identifier from `id_field`.
///
/// Strings and numbers are ids. Any other type, an empty string, or a
/// missing field yields `None`.
#[must_use]
pub fn record_id(record: &Record, id_field: &str) -> Option<RecordId> {
    match record.get(id_field)? {
        Value::String(s) if !s.is_empty() => Some(RecordId::Text(s.clone())),
        Value::Number(n) => Some(RecordId::Number(n.to_string())),
        _ => None,
    }
}

/// One filter dimension/value pair, swept independently.
///
/// The canonical string form `dimension:value` is the ledger key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScanKey {
    dimension: String,
    value: String,
}

impl ScanKey {
    /// Create a new `ScanKey`.
    ///
    /// # Errors
    /// Returns error if either part is empty or the dimension contains `:`.
    pub fn new(dimension: impl Into<String>, value: impl Into<String>) -> Result<Self, HarvestError> {
        let dimension = dimension.into();
        let value = value.into();

        if dimension.is_empty() || value.is_empty() {
            return Err(HarvestError::Validation(format!(
                "invalid scan key: dimension and value must be non-empty, got '{dimension}:{value}'"
            )));
        }
        if dimension.contains(':') {
            return Err(HarvestError::Validation(format!(
                "invalid scan key: dimension must not contain ':', got '{dimension}'"
            )));
        }

        Ok(Self { dimension, value })
    }

    /// The filter column, e.g. `Country`.
    #[must_use]
    pub fn dimension(&self) -> &str {
        &self.dimension
    }

    /// The filter value, e.g. `Colombia`.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for ScanKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.dimension, self.value)
    }
}

impl FromStr for ScanKey {
    type Err = HarvestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (dimension, value) = s.split_once(':').ok_or_else(|| {
            HarvestError::Validation(format!("invalid scan key: expected 'dimension:value', got '{s}'"))
        })?;
        Self::new(dimension, value)
    }
}

/// Ordering of one pagination pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Ascending by the scan dimension
    #[serde(rename = "Asc")]
    Ascending,
    /// Descending by the scan dimension
    #[serde(rename = "Desc")]
    Descending,
}

impl Direction {
    /// Order in which a key's sweeps run.
    pub const SWEEP_ORDER: [Self; 2] = [Self::Ascending, Self::Descending];

    /// Wire form used by the listing API and the ledger file.
    #[must_use]
    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::Ascending => "Asc",
            Self::Descending => "Desc",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Resume state for one scan key.
///
/// When `completed` is set, `direction` and `next_page` carry no meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepState {
    /// Both sweeps have been exhausted
    pub completed: bool,
    /// 1-based page to fetch next
    pub next_page: u32,
    /// Sweep to resume
    pub direction: Direction,
}

impl SweepState {
    /// State of a key that has never been swept.
    #[must_use]
    pub fn fresh() -> Self {
        Self::at(Direction::Ascending, 1)
    }

    /// Partial progress at `page` in `direction`.
    #[must_use]
    pub fn at(direction: Direction, page: u32) -> Self {
        Self {
            completed: false,
            next_page: page.max(1),
            direction,
        }
    }

    /// State after the ascending sweep is exhausted.
    #[must_use]
    pub fn handoff() -> Self {
        Self::at(Direction::Descending, 1)
    }

    /// Terminal state: the key needs no further work.
    #[must_use]
    pub fn finished() -> Self {
        Self {
            completed: true,
            next_page: 1,
            direction: Direction::Descending,
        }
    }

    /// Short operator-facing description.
    #[must_use]
    pub fn describe(&self) -> String {
        if self.completed {
            "done".to_string()
        } else if *self == Self::fresh() {
            "pending".to_string()
        } else {
            format!("{} page {}", self.direction, self.next_page)
        }
    }
}

impl Default for SweepState {
    fn default() -> Self {
        Self::fresh()
    }
}
