//! Sweep controller: one (scan key, direction) pagination pass.
//!
//! Each page is fetched, merged into the record store and checkpointed in
//! the progress ledger before the next request goes out. When a flush is
//! due the snapshot is written first, so the ledger never moves past a page
//! whose records are still only in memory. Every fault stops the sweep at
//! the page that faulted, so resuming re-requests that page and nothing
//! before it.

use crate::error::Result;
use crate::pacing::Pacing;
use crate::session::HarvestSession;
use harvester_core::{Direction, HarvestConfig, Record, ScanKey, SweepState};
use harvester_fetch::{Fetcher, PageResult};
use tracing::{debug, error, info, warn};

/// Default number of consecutive all-duplicate pages tolerated.
pub const DEFAULT_DUPLICATE_PAGE_THRESHOLD: u32 = 10_000;

/// Limits and cadences for a sweep.
#[derive(Debug, Clone)]
pub struct SweepSettings {
    /// Consecutive pages without a new record before the sweep stops
    pub duplicate_page_threshold: u32,
    /// Flush the record snapshot whenever the next page is a multiple of this (0 = never)
    pub flush_every_pages: u32,
}

impl SweepSettings {
    /// Settings from configuration.
    #[must_use]
    pub fn from_config(config: &HarvestConfig) -> Self {
        Self {
            duplicate_page_threshold: config.scan.duplicate_page_threshold,
            flush_every_pages: config.storage.flush_every_pages,
        }
    }
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            duplicate_page_threshold: DEFAULT_DUPLICATE_PAGE_THRESHOLD,
            flush_every_pages: 1,
        }
    }
}

/// Why a sweep returned control to its caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepOutcome {
    /// Ascending sweep exhausted; descending starts at page 1
    HandedOff,
    /// Descending sweep exhausted; the key is done
    Completed,
    /// Too many consecutive pages without a new record
    DuplicateThreshold {
        /// Page the threshold was reached on
        page: u32,
    },
    /// The server rate limited or banned the client
    RateLimited {
        /// Page to retry
        page: u32,
    },
    /// The server rejected the request
    HttpError {
        /// Page to retry
        page: u32,
        /// HTTP status code
        status: u16,
    },
    /// The request never completed
    TransportFault {
        /// Page to retry
        page: u32,
    },
    /// Rows came back on the highest representable page
    PageLimit {
        /// Last page fetched
        page: u32,
    },
}

impl SweepOutcome {
    /// The sweep ran past its last page.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::HandedOff | Self::Completed)
    }

    /// The run should pause rather than move on.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Drives single sweeps against a [`Fetcher`].
#[derive(Debug)]
pub struct SweepController<F> {
    fetcher: F,
    settings: SweepSettings,
    pacing: Pacing,
}

impl<F: Fetcher> SweepController<F> {
    /// Create a controller.
    #[must_use]
    pub fn new(fetcher: F, settings: SweepSettings, pacing: Pacing) -> Self {
        Self {
            fetcher,
            settings,
            pacing,
        }
    }

    /// Controller configured from `config`.
    #[must_use]
    pub fn from_config(fetcher: F, config: &HarvestConfig) -> Self {
        Self::new(
            fetcher,
            SweepSettings::from_config(config),
            Pacing::from_config(&config.pacing),
        )
    }

    /// The fetcher this controller drives.
    #[must_use]
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Sweep `key` in `direction` from `start_page` until exhaustion or a stop.
    ///
    /// The ledger is persisted after every page. Fetch faults are not
    /// errors: they checkpoint the faulting page and come back as a
    /// [`SweepOutcome`].
    ///
    /// # Errors
    /// Returns error only if the ledger or snapshot cannot be written.
    pub async fn run_sweep(
        &self,
        session: &mut HarvestSession,
        key: &ScanKey,
        direction: Direction,
        start_page: u32,
    ) -> Result<SweepOutcome> {
        let mut page = start_page.max(1);
        let mut consecutive_duplicates: u32 = 0;

        info!(key = %key, direction = %direction, page, "starting sweep");

        loop {
            let rows = match self.fetcher.fetch(key, direction, page).await {
                PageResult::Rows(rows) => rows,
                PageResult::RateLimited => {
                    warn!(key = %key, direction = %direction, page, "rate limited, saving position");
                    return self.stop(
                        session,
                        key,
                        SweepState::at(direction, page),
                        SweepOutcome::RateLimited { page },
                    );
                }
                PageResult::HttpError { status, body } => {
                    error!(key = %key, direction = %direction, page, status, body = %body, "HTTP error");
                    return self.stop(
                        session,
                        key,
                        SweepState::at(direction, page),
                        SweepOutcome::HttpError { page, status },
                    );
                }
                PageResult::TransportFault(detail) => {
                    warn!(
                        key = %key,
                        direction = %direction,
                        page,
                        detail = %detail,
                        backoff = ?self.pacing.transport_backoff(),
                        "request failed, backing off"
                    );
                    self.pacing.after_transport_fault().await;
                    return self.stop(
                        session,
                        key,
                        SweepState::at(direction, page),
                        SweepOutcome::TransportFault { page },
                    );
                }
            };

            if rows.is_empty() {
                let (state, outcome) = match direction {
                    Direction::Ascending => (SweepState::handoff(), SweepOutcome::HandedOff),
                    Direction::Descending => (SweepState::finished(), SweepOutcome::Completed),
                };
                info!(key = %key, direction = %direction, page, "sweep exhausted");
                return self.stop(session, key, state, outcome);
            }

            let added = Self::ingest(session, key, page, rows);
            if added > 0 {
                consecutive_duplicates = 0;
                info!(
                    key = %key,
                    direction = %direction,
                    page,
                    new_rows = added,
                    total_records = session.store.len(),
                    "page fetched"
                );
            } else {
                consecutive_duplicates += 1;
                info!(
                    key = %key,
                    direction = %direction,
                    page,
                    consecutive_duplicates,
                    "page fetched, no new rows"
                );
            }

            if consecutive_duplicates >= self.settings.duplicate_page_threshold {
                warn!(
                    key = %key,
                    direction = %direction,
                    page,
                    threshold = self.settings.duplicate_page_threshold,
                    "duplicate page threshold reached, stopping sweep"
                );
                return self.stop(
                    session,
                    key,
                    SweepState::at(direction, page),
                    SweepOutcome::DuplicateThreshold { page },
                );
            }

            let Some(next_page) = page.checked_add(1) else {
                warn!(key = %key, direction = %direction, page, "no page numbers left, stopping sweep");
                return self.stop(
                    session,
                    key,
                    SweepState::at(direction, page),
                    SweepOutcome::PageLimit { page },
                );
            };
            page = next_page;

            // Records reach the snapshot before the ledger moves past their page
            let cadence = self.settings.flush_every_pages;
            if cadence > 0 && page % cadence == 0 && session.store.is_dirty() {
                session.flush()?;
                info!(page, records = session.store.len(), "saved snapshot");
            }
            session.ledger.checkpoint(key, SweepState::at(direction, page))?;

            self.pacing.between_pages().await;
        }
    }

    /// Merge a page into the store; returns the number of new records.
    fn ingest(session: &mut HarvestSession, key: &ScanKey, page: u32, rows: Vec<Record>) -> usize {
        let mut added = 0;
        let mut without_id = 0;

        for row in rows {
            if session.store.id_of(&row).is_none() {
                without_id += 1;
            } else if session.store.insert(row) {
                added += 1;
            }
        }

        if without_id > 0 {
            warn!(
                key = %key,
                page,
                count = without_id,
                id_field = %session.store.id_field(),
                "skipped rows without an id"
            );
        }
        added
    }

    /// Persist any unsaved records, then `state`, and report `outcome`.
    fn stop(
        &self,
        session: &mut HarvestSession,
        key: &ScanKey,
        state: SweepState,
        outcome: SweepOutcome,
    ) -> Result<SweepOutcome> {
        if session.store.is_dirty() {
            session.flush()?;
        }
        session.ledger.checkpoint(key, state)?;
        debug!(key = %key, state = %state.describe(), outcome = ?outcome, "sweep stopped");
        Ok(outcome)
    }
}
