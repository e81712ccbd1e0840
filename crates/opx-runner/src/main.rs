//! # opx-runner
//!
//! Main entry point for the operations gateway.
//!
//! Loads a JSON configuration file and either syncs executed operations
//! from the broker (with dedup against the local store) or renders an
//! offline repo settlement report over normalized operations.
//!
//! # Usage
//!
//! ```bash
//! opx-runner config.json sync --refresh --log-level info
//! opx-runner config.json report --input repo-ops.json
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use opx_broker::BrokerTransport;
use opx_broker::rest::{BrokerConfig, RestBroker};
use opx_core::config::AppConfig;
use opx_core::retry::RetryPolicy;
use opx_core::{Operation, RepoOperation, SyncStatus};
use opx_fees::{aggregate_breakdowns, compute_breakdown};
use opx_sync::{SyncEvent, SyncOrchestrator};
use tracing::{error, info, warn};

/// Brokerage Operations Sync & Repo Fee Runner.
#[derive(Parser)]
#[command(name = "opx-runner", about = "Brokerage Operations Sync & Repo Fee Runner")]
struct Cli {
    /// Configuration file path (JSON).
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Optional log directory for file output.
    #[arg(long)]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sync executed operations from the broker into the local store.
    Sync {
        /// Incremental mode: only operations newer than the last
        /// successful sync.
        #[arg(long)]
        refresh: bool,

        /// Trade date filter (`YYYY-MM-DD`), full mode only.
        #[arg(long)]
        date: Option<String>,
    },

    /// Repo settlement report over a file of normalized repo operations.
    Report {
        /// JSON file containing an array of repo operations.
        #[arg(long)]
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Initialize logging
    let config = opx_core::config::load_config(&cli.config)?;
    opx_core::logging::init_logging(
        &cli.log_level,
        cli.log_dir.as_deref().or(config.log_path.as_deref()),
        &config.module_name(),
    );

    info!(
        "opx-runner starting — config={}, log_level={}",
        cli.config.display(),
        cli.log_level,
    );

    // 2. Surface fee-table gaps up front instead of as per-row blocks.
    for name in config.fees.validate() {
        warn!("fee config incomplete: {name}");
    }

    // 3. Dispatch
    match cli.command {
        Command::Sync { refresh, date } => run_sync(&config, refresh, date).await,
        Command::Report { input } => run_report(&config, &input),
    }
}

async fn run_sync(config: &AppConfig, refresh: bool, date: Option<String>) -> Result<()> {
    let transport = RestBroker::new(BrokerConfig::from_section(&config.broker)?);

    info!("logging in as {}", config.broker.username);
    let auth = transport
        .login(&config.broker.username, &config.broker.password)
        .await
        .context("broker login failed")?;
    let mut auth = Some(auth);

    let (events_tx, mut events_rx) = opx_sync::event::channel();
    let orchestrator = SyncOrchestrator::new(transport)
        .with_retry_policy(RetryPolicy::from_millis(
            &config.broker.effective_retry_schedule_ms(),
        ))
        .with_page_size(config.broker.effective_page_size())
        .with_account_id(config.broker.account_id.clone())
        .with_events(events_tx);

    // Ctrl+C requests cooperative cancellation; the in-flight page fetch
    // completes, then the session terminates with nothing committed.
    let cancel = orchestrator.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("cancellation requested — finishing the in-flight page");
            cancel.cancel();
        }
    });

    tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            match event {
                SyncEvent::Started { session_id, mode } => {
                    info!("session {session_id} started in {mode} mode");
                }
                SyncEvent::TokenRefreshed => info!("broker token refreshed"),
                SyncEvent::PageStaged { page, accepted, evaluated } => {
                    info!("page {page}: {accepted}/{evaluated} row(s) staged");
                }
                SyncEvent::Committed { imported, new_orders } => {
                    info!("committed {imported} operation(s) across {new_orders} new order(s)");
                }
                SyncEvent::Failed { message } => error!("sync failed: {message}"),
                SyncEvent::Canceled => warn!("sync canceled — nothing committed"),
            }
        }
    });

    let sync_section = config.sync.clone().unwrap_or_default();
    let baseline = load_store(sync_section.store_path.as_deref())?;
    info!("baseline: {} operation(s)", baseline.len());

    let report = if refresh {
        let watermark = sync_section.last_sync_timestamp_ms.unwrap_or_else(|| {
            baseline.iter().map(|op| op.trade_timestamp).max().unwrap_or(0)
        });
        orchestrator.refresh(&mut auth, &baseline, watermark).await
    } else {
        orchestrator.sync_daily(&mut auth, &baseline, date).await
    };

    let session = &report.session;
    match session.status {
        SyncStatus::Success => {
            info!(
                "sync {} succeeded — {} imported, {} evaluated, {} page(s), {} retry(ies)",
                session.session_id,
                session.operations_imported_count,
                session.operations_evaluated_count,
                session.pages_fetched,
                session.retry_attempts,
            );
            if let Some(path) = sync_section.store_path.as_deref() {
                save_store(path, &report.operations)?;
                info!("store updated: {} operation(s) at {path}", report.operations.len());
            }
            let consolidated = opx_core::consolidate::vwap_consolidate(&report.operations);
            info!(
                "{} position row(s) after consolidating {} fill(s)",
                consolidated.len(),
                report.operations.len(),
            );
            Ok(())
        }
        SyncStatus::Canceled => {
            warn!("sync {} canceled by request", session.session_id);
            Ok(())
        }
        SyncStatus::Failed => {
            let failure = session.error.as_ref().expect("failed sessions carry an error");
            if failure.needs_reauth {
                error!("broker session is no longer valid — log in again");
            }
            if let Some(secs) = failure.suggested_wait_secs {
                error!("venue is rate limiting — retry in {secs}s");
            }
            bail!("sync failed: {}", failure.message);
        }
        SyncStatus::Idle | SyncStatus::InProgress => {
            unreachable!("orchestrator returns terminal sessions only")
        }
    }
}

fn run_report(config: &AppConfig, input: &Path) -> Result<()> {
    let content = std::fs::read_to_string(input)
        .with_context(|| format!("reading {}", input.display()))?;
    let operations: Vec<RepoOperation> =
        serde_json::from_str(&content).context("parsing repo operations")?;
    info!("report over {} operation(s)", operations.len());

    // Group by instrument + tenor; each group settles as one line.
    let mut groups: BTreeMap<(String, Option<i64>), Vec<opx_core::FeeBreakdown>> = BTreeMap::new();
    let mut skipped = 0usize;
    for op in &operations {
        match compute_breakdown(op, &config.fees) {
            Some(breakdown) => {
                groups
                    .entry((op.symbol.clone(), breakdown.tenor_days))
                    .or_default()
                    .push(breakdown);
            }
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        info!("{skipped} operation(s) were not repo instruments");
    }

    for ((symbol, tenor), members) in &groups {
        let Some(agg) = aggregate_breakdowns(members) else { continue };
        let r = agg.rounding;
        let tenor_label = tenor.map_or_else(|| "?".to_string(), |d| format!("{d}D"));
        info!(
            "{symbol} {tenor_label} [{}] base={:.2} interest={:.2} expenses={:.2} net={:.2} status={:?}",
            agg.role,
            r.apply(agg.base_amount),
            r.apply(agg.accrued_interest),
            r.apply(agg.total_expenses),
            r.apply(agg.net_settlement),
            agg.status,
        );
        for warning in &agg.warnings {
            warn!("{symbol} {tenor_label}: {:?} — {}", warning.code, warning.message);
        }
    }

    Ok(())
}

fn load_store(path: Option<&str>) -> Result<Vec<Operation>> {
    let Some(path) = path else { return Ok(Vec::new()) };
    if !Path::new(path).exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path).with_context(|| format!("reading store {path}"))?;
    serde_json::from_str(&content).with_context(|| format!("parsing store {path}"))
}

fn save_store(path: &str, operations: &[Operation]) -> Result<()> {
    let content = serde_json::to_string_pretty(operations)?;
    std::fs::write(path, content).with_context(|| format!("writing store {path}"))
}
