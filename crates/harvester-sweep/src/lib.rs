//! Harvester Sweep - resumable pagination and deduplication.
//!
//! This crate drives the listing API one scan key at a time: an ascending
//! sweep, then a descending one, checkpointing the progress ledger after
//! every page so an interrupted run resumes where it stopped.
//!
//! # Features
//!
//! - Per-page checkpointing: a ban or crash loses at most the page in flight
//! - Cross-run deduplication through the record store's id set
//! - Duplicate-page threshold as a safety stop on misbehaving feeds
//! - Randomized pacing between requests, fixed backoff after transport faults
//!
//! # Example
//!
//! ```rust,ignore
//! use harvester_fetch::HttpFetcher;
//! use harvester_sweep::{BatchDriver, HarvestSession};
//!
//! let fetcher = HttpFetcher::connect(config.endpoint.clone()).await?;
//! let mut session = HarvestSession::open(&config.storage, &config.scan.id_field, chrono::Utc::now())?;
//! let driver = BatchDriver::from_config(fetcher, &config);
//! let report = driver.run(&mut session, &config.scan_keys()?).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod controller;
pub mod driver;
pub mod error;
pub mod pacing;
pub mod session;

// Re-export commonly used types
pub use controller::{SweepController, SweepOutcome, SweepSettings};
pub use driver::{BatchDriver, BatchReport, KeyReport};
pub use error::{Result, SweepError};
pub use pacing::Pacing;
pub use session::HarvestSession;
