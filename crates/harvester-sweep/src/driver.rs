//! Batch driver: sequences sweeps across every configured scan key.

use crate::controller::{SweepController, SweepOutcome};
use crate::error::Result;
use crate::session::HarvestSession;
use harvester_core::{Direction, HarvestConfig, ScanKey, SweepState};
use harvester_fetch::Fetcher;
use tracing::{info, warn};

/// What happened to one scan key during a run.
#[derive(Debug, Clone)]
pub struct KeyReport {
    /// The key
    pub key: ScanKey,
    /// Sweeps run for the key, in order
    pub outcomes: Vec<(Direction, SweepOutcome)>,
    /// Ledger state after the last sweep
    pub final_state: SweepState,
    /// Records first seen while sweeping this key
    pub new_records: usize,
    /// Already completed before the run started
    pub skipped: bool,
}

impl KeyReport {
    fn skipped(key: &ScanKey, state: SweepState) -> Self {
        Self {
            key: key.clone(),
            outcomes: Vec::new(),
            final_state: state,
            new_records: 0,
            skipped: true,
        }
    }
}

/// Summary of a batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Per-key reports for every key that was reached
    pub keys: Vec<KeyReport>,
    /// A rate limit stopped the run before all keys were attempted
    pub halted_by_rate_limit: bool,
    /// Records first seen during this run
    pub new_records: usize,
    /// Records in the store when the run ended
    pub total_records: usize,
}

impl BatchReport {
    /// Keys whose ledger entry is terminal after the run.
    #[must_use]
    pub fn completed_keys(&self) -> usize {
        self.keys.iter().filter(|k| k.final_state.completed).count()
    }
}

/// Runs the sweep controller over a list of scan keys.
#[derive(Debug)]
pub struct BatchDriver<F> {
    controller: SweepController<F>,
    halt_on_rate_limit: bool,
}

impl<F: Fetcher> BatchDriver<F> {
    /// Create a driver around an existing controller.
    #[must_use]
    pub fn new(controller: SweepController<F>, halt_on_rate_limit: bool) -> Self {
        Self {
            controller,
            halt_on_rate_limit,
        }
    }

    /// Driver and controller configured from `config`.
    #[must_use]
    pub fn from_config(fetcher: F, config: &HarvestConfig) -> Self {
        Self::new(
            SweepController::from_config(fetcher, config),
            config.scan.halt_on_rate_limit,
        )
    }

    /// The wrapped controller.
    #[must_use]
    pub fn controller(&self) -> &SweepController<F> {
        &self.controller
    }

    /// Sweep every key in order, then flush the record store.
    ///
    /// Completed keys are skipped. A key's descending sweep runs in the same
    /// pass as soon as its ascending sweep hands off.
    pub async fn run(&self, session: &mut HarvestSession, keys: &[ScanKey]) -> Result<BatchReport> {
        let mut report = BatchReport::default();
        let records_at_start = session.store.len();

        info!(keys = keys.len(), records = records_at_start, "starting batch");

        for key in keys {
            let state = session.ledger.state(key);
            if state.completed {
                info!(key = %key, "already completed, skipping");
                report.keys.push(KeyReport::skipped(key, state));
                continue;
            }

            let key_report = self.run_key(session, key, state).await?;
            let rate_limited = key_report
                .outcomes
                .iter()
                .any(|(_, outcome)| outcome.is_rate_limited());
            report.keys.push(key_report);

            if rate_limited && self.halt_on_rate_limit {
                warn!(key = %key, "rate limited, pausing the run");
                report.halted_by_rate_limit = true;
                break;
            }
        }

        session.flush()?;

        report.total_records = session.store.len();
        report.new_records = report.total_records.saturating_sub(records_at_start);

        info!(
            new_records = report.new_records,
            total_records = report.total_records,
            completed_keys = report.completed_keys(),
            halted = report.halted_by_rate_limit,
            snapshot = %session.snapshot_path().display(),
            "batch finished"
        );

        Ok(report)
    }

    async fn run_key(
        &self,
        session: &mut HarvestSession,
        key: &ScanKey,
        mut state: SweepState,
    ) -> Result<KeyReport> {
        let records_before = session.store.len();
        let mut outcomes = Vec::new();

        for direction in Direction::SWEEP_ORDER {
            if state.completed {
                break;
            }
            if state.direction != direction {
                continue;
            }

            let outcome = self
                .controller
                .run_sweep(session, key, direction, state.next_page)
                .await?;
            outcomes.push((direction, outcome));
            state = session.ledger.state(key);
        }

        Ok(KeyReport {
            key: key.clone(),
            outcomes,
            final_state: state,
            new_records: session.store.len().saturating_sub(records_before),
            skipped: false,
        })
    }
}
