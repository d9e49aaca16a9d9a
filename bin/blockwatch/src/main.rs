//! Chain metadata monitor CLI.
//!
//! `blockwatch ingest` runs the polling ingestion loop against a node RPC;
//! `blockwatch report` aggregates whatever the store holds into statistics,
//! charts, and a report document.

use anyhow::Result;
use blockwatch_ingest::{Ingestor, IngestorConfig, NodeBlockSource};
use blockwatch_report::Reporter;
use blockwatch_rpc::NodeClient;
use blockwatch_store::CsvStore;
use clap::{Args, Parser, Subcommand};
use std::{path::PathBuf, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "blockwatch",
    about = "Observes a node RPC and records per-block metadata",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Continuously ingest block metadata into the record store.
    Ingest(IngestArgs),
    /// Generate statistics, charts, and a report from the record store.
    Report(ReportArgs),
}

#[derive(Debug, Args)]
struct IngestArgs {
    /// Base URL of the node RPC endpoint.
    #[arg(long, default_value = "http://localhost:26657")]
    rpc_url: String,
    /// Path of the CSV record store.
    #[arg(long, default_value = "data/chain_data.csv")]
    store: PathBuf,
    /// Seconds to idle between catch-up passes.
    #[arg(long, default_value_t = 5)]
    poll_interval: u64,
    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 10)]
    rpc_timeout: u64,
    /// Fetch retries per height within one pass.
    #[arg(long, default_value_t = 4)]
    max_retries: usize,
}

#[derive(Debug, Args)]
struct ReportArgs {
    /// Path of the CSV record store.
    #[arg(long, default_value = "data/chain_data.csv")]
    store: PathBuf,
    /// Directory the report artifacts are written into.
    #[arg(long, default_value = "report")]
    out: PathBuf,
    /// Unix timestamp to project a future chain height for.
    #[arg(long)]
    estimate_at: Option<i64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match Cli::parse().command {
        Command::Ingest(args) => ingest(args).await,
        Command::Report(args) => report(&args),
    }
}

async fn ingest(args: IngestArgs) -> Result<()> {
    let store = CsvStore::open(&args.store)?;
    let client = NodeClient::new(&args.rpc_url, Duration::from_secs(args.rpc_timeout))?;
    let config = IngestorConfig {
        poll_interval: Duration::from_secs(args.poll_interval),
        max_retries: args.max_retries,
        ..Default::default()
    };

    let cancellation = CancellationToken::new();
    let handle = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!(target: "blockwatch", "interrupt received, shutting down");
            handle.cancel();
        }
    });

    info!(
        target: "blockwatch",
        rpc_url = %args.rpc_url,
        store = %args.store.display(),
        "starting ingestion"
    );
    Ingestor::new(NodeBlockSource::new(client), store, config, cancellation).run().await?;
    Ok(())
}

fn report(args: &ReportArgs) -> Result<()> {
    let reporter = Reporter::new(args.store.clone(), args.out.clone());
    reporter.generate(args.estimate_at)?;
    Ok(())
}
