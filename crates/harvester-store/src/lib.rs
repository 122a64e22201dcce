//! Harvester Store - durable state for resumable harvesting.
//!
//! Two documents survive between runs:
//!
//! - **Dataset snapshots** (`dataset_<timestamp>.json`): the full
//!   deduplicated record collection, one file per run. [`RecordStore`]
//!   loads every prior snapshot at startup and flushes to a fresh one.
//! - **Progress ledger** (`completed_filters.json`): per scan key resume
//!   state. [`ProgressLedger`] is rewritten after every page.
//!
//! Both are written to a sibling temp file and renamed into place, so a
//! killed process leaves either the old or the new document, never a torn one.
//!
//! # Example
//!
//! ```ignore
//! use harvester_store::{ProgressLedger, RecordStore};
//!
//! let prior = RecordStore::discover("datas".as_ref())?;
//! let mut store = RecordStore::load(&prior, "CertificateCode")?;
//! let mut ledger = ProgressLedger::load("completed_filters.json")?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod error;
pub mod ledger;
pub mod records;

// Re-export commonly used types
pub use error::{Result, StoreError};
pub use ledger::ProgressLedger;
pub use records::RecordStore;

use serde::Serialize;
use std::fs;
use std::path::Path;

/// Serialize `value` as JSON with four-space indentation.
fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    buf.push(b'\n');
    Ok(buf)
}

/// Read `path` as text; bytes that are not UTF-8 make it corrupt data.
fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::InvalidData => StoreError::corrupt(path, format!("not valid UTF-8: {e}")),
        _ => StoreError::Io(e),
    })
}

/// Replace `path` with `contents` via a sibling temp file and rename.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }

    let mut tmp_name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    fs::write(&tmp_path, contents)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}
