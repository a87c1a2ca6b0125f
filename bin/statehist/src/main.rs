//! Command-line front end: build the height-versioned state index from a
//! node's per-block diffs, or verify it against a live node.

use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use clap::{Parser, Subcommand};
use statehist_checker::{run_checks, CheckerConfig};
use statehist_client::{HttpChainHistory, HttpStateOracle};
use statehist_ingest::IngestDriver;
use statehist_store::HistoryStore;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "statehist", about = "Height-versioned EVM state index and checker")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Ingest per-block transaction diffs into the index.
    Ingest {
        /// Directory holding the index.
        #[arg(long)]
        db_path: PathBuf,
        /// HTTP endpoint serving blocks and transaction diffs.
        #[arg(long)]
        rpc_url: String,
        /// First height left out of the run; heights [1, end) are ingested.
        #[arg(long)]
        end_height: u64,
        /// Per-request timeout in seconds.
        #[arg(long, default_value_t = 15)]
        rpc_timeout_secs: u64,
    },
    /// Verify reconstructed history against a live node's state.
    Check {
        /// Directory holding the index, opened read-only.
        #[arg(long)]
        db_path: PathBuf,
        /// HTTP endpoint answering `eth` state queries.
        #[arg(long)]
        rpc_url: String,
        /// Height that still-open intervals are closed at.
        #[arg(long)]
        latest_height: u64,
        /// Fixed sampling seed, for replaying a previous run.
        #[arg(long)]
        seed: Option<u64>,
        /// Per-request timeout in seconds.
        #[arg(long, default_value_t = 15)]
        rpc_timeout_secs: u64,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn spawn_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            cancel.cancel();
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cancel = CancellationToken::new();
    spawn_ctrl_c(cancel.clone());

    match cli.command {
        Command::Ingest {
            db_path,
            rpc_url,
            end_height,
            rpc_timeout_secs,
        } => {
            let history =
                HttpChainHistory::with_timeout(&rpc_url, Duration::from_secs(rpc_timeout_secs))
                    .context("building chain-history client")?;
            let store = HistoryStore::open(&db_path)
                .with_context(|| format!("opening store at {}", db_path.display()))?;
            let summary = IngestDriver::new(&history, &store)
                .run(end_height, &cancel)
                .await?;
            info!(
                blocks = summary.blocks,
                txs = summary.txs,
                skipped = summary.skipped_txs,
                "ingestion finished"
            );
        }
        Command::Check {
            db_path,
            rpc_url,
            latest_height,
            seed,
            rpc_timeout_secs,
        } => {
            let oracle =
                HttpStateOracle::with_timeout(&rpc_url, Duration::from_secs(rpc_timeout_secs))
                    .context("building state-oracle client")?;
            let store = HistoryStore::open_read_only(&db_path)
                .with_context(|| format!("opening store at {}", db_path.display()))?;
            let config = CheckerConfig {
                seed,
                ..Default::default()
            };
            let summary = run_checks(store, &oracle, latest_height, config, &cancel).await?;
            info!(
                records = summary.records,
                checked = summary.checked,
                mismatches = summary.mismatches,
                skipped = summary.skipped,
                "check finished"
            );
        }
    }
    Ok(())
}
