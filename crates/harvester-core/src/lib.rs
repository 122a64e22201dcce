//! Harvester Core - Foundation crate for the harvester workspace.
//!
//! This crate provides the shared domain types, error handling and
//! configuration management that the store, fetch and sweep crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths and env overrides
//! - [`types`] - Scan keys, sweep directions, resume state and records
//!
//! # Example
//!
//! ```rust
//! use harvester_core::{Direction, ScanKey, SweepState};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let key: ScanKey = "Country:Colombia".parse()?;
//! assert_eq!(key.dimension(), "Country");
//!
//! let state = SweepState::fresh();
//! assert_eq!(state.direction, Direction::Ascending);
//! assert_eq!(state.next_page, 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{EndpointConfig, HarvestConfig, PacingConfig, ScanConfig, StorageConfig};
pub use error::{ConfigError, ConfigResult, HarvestError, Result};
pub use types::{record_id, Direction, Record, RecordId, ScanKey, SweepState};
