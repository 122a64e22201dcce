//! Harvester command line.
//!
//! `run` sweeps every configured scan key, `status` reports the ledger and
//! `reset` forgets a key's progress.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use harvester_core::{HarvestConfig, ScanKey};
use harvester_fetch::HttpFetcher;
use harvester_store::{ProgressLedger, RecordStore};
use harvester_sweep::{BatchDriver, BatchReport, HarvestSession};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "harvester")]
#[command(about = "Resumable harvester for paginated listing APIs", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sweep every configured scan key, resuming from the ledger
    Run,
    /// Show each scan key's progress and the number of known records
    Status,
    /// Forget a key's progress so it is swept again from page 1
    Reset {
        /// Scan key as `dimension:value`
        key: String,
    },
}

/// Initialize tracing subscriber for logging
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,harvester=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = HarvestConfig::load_with_env(cli.config.as_deref())
        .context("failed to load configuration")?;

    match cli.command {
        Commands::Run => run(&config).await,
        Commands::Status => status(&config),
        Commands::Reset { key } => reset(&config, &key),
    }
}

async fn run(config: &HarvestConfig) -> Result<()> {
    config
        .validate()
        .context("configuration is not complete enough to run")?;
    let keys = config.scan_keys()?;

    info!("Starting harvester v{}", env!("CARGO_PKG_VERSION"));

    let mut session = HarvestSession::open(&config.storage, &config.scan.id_field, Utc::now())
        .context("failed to load prior records or ledger")?;
    let fetcher = HttpFetcher::connect(config.endpoint.clone())
        .await
        .context("failed to start fetch session")?;

    let driver = BatchDriver::from_config(fetcher, config);
    let report = driver.run(&mut session, &keys).await?;

    if report.halted_by_rate_limit {
        warn!("run paused by rate limiting; rerun later to resume");
    }
    for line in summary_lines(&report) {
        println!("{line}");
    }
    println!("snapshot: {}", session.snapshot_path().display());
    Ok(())
}

fn status(config: &HarvestConfig) -> Result<()> {
    let keys = config.scan_keys()?;
    let ledger = ProgressLedger::load(&config.storage.ledger_path)
        .context("failed to read progress ledger")?;
    let snapshots = RecordStore::discover(&config.storage.output_dir)?;
    let store = RecordStore::load(&snapshots, config.scan.id_field.clone())
        .context("failed to read prior snapshots")?;

    for line in status_lines(&keys, &ledger, store.len()) {
        println!("{line}");
    }
    Ok(())
}

fn reset(config: &HarvestConfig, key: &str) -> Result<()> {
    let key: ScanKey = key.parse()?;
    if reset_entry(&config.storage.ledger_path, &key)? {
        println!("{key}: reset, next run starts at Asc page 1");
    } else {
        println!("{key}: no ledger entry");
    }
    Ok(())
}

/// Remove `key` from the ledger at `path`; returns whether it was present.
fn reset_entry(path: &Path, key: &ScanKey) -> Result<bool> {
    let mut ledger = ProgressLedger::load(path).context("failed to read progress ledger")?;
    let Some(previous) = ledger.remove(&key.to_string()) else {
        return Ok(false);
    };

    ledger.save().context("failed to write progress ledger")?;
    info!(key = %key, previous = %previous.describe(), "ledger entry removed");
    Ok(true)
}

fn status_lines(keys: &[ScanKey], ledger: &ProgressLedger, records: usize) -> Vec<String> {
    let configured: Vec<String> = keys.iter().map(ToString::to_string).collect();

    let mut lines: Vec<String> = keys
        .iter()
        .map(|key| format!("{key}: {}", ledger.state(key).describe()))
        .collect();

    lines.extend(
        ledger
            .entries()
            .filter(|(name, _)| !configured.iter().any(|c| c == name))
            .map(|(name, state)| format!("{name}: {} (not configured)", state.describe())),
    );

    lines.push(format!("records: {records}"));
    lines
}

fn summary_lines(report: &BatchReport) -> Vec<String> {
    let mut lines: Vec<String> = report
        .keys
        .iter()
        .map(|k| {
            if k.skipped {
                format!("{}: done (skipped)", k.key)
            } else {
                format!(
                    "{}: {} (+{} records)",
                    k.key,
                    k.final_state.describe(),
                    k.new_records
                )
            }
        })
        .collect();

    lines.push(format!(
        "records: {} new, {} total",
        report.new_records, report.total_records
    ));
    if report.halted_by_rate_limit {
        lines.push("halted: rate limited".to_string());
    }
    lines
}
