//! Command-line driver for the GPAce priority engine.
//!
//! `once` recomputes and prints the published record as JSON on stdout.
//! `watch` keeps recomputing on an interval until Ctrl-C. All tracing goes
//! to stderr so stdout stays machine-readable.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use gpace::view::{SortDirection, SortField, sorted_view};
use gpace::{
    EngineConfig, PriorityEngine, RecomputeOutcome, RecomputeRunner, gpace_dirs, trigger_channel,
};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Rank GPAce study tasks by priority.
#[derive(Parser)]
#[command(name = "gpace-rank", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Recompute once and print the ranking.
    Once {
        /// Re-sort the printed list by this field.
        #[arg(long, value_parser = parse_field)]
        sort: Option<SortField>,

        /// Sort ascending instead of descending.
        #[arg(long)]
        asc: bool,
    },

    /// Recompute periodically until interrupted.
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gpace=info,gpace_scoring=info")),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(gpace_dirs::config_file);
    let config = EngineConfig::load_or_default(&config_path)?;
    let engine = PriorityEngine::from_config(&config)?;

    match cli.command.unwrap_or(Command::Once {
        sort: None,
        asc: false,
    }) {
        Command::Once { sort, asc } => run_once(engine, sort, asc).await,
        Command::Watch => run_watch(engine, &config).await,
    }
}

async fn run_once(
    engine: PriorityEngine,
    sort: Option<SortField>,
    asc: bool,
) -> anyhow::Result<()> {
    let receipt = match engine.recompute().await {
        RecomputeOutcome::Published(receipt) => receipt,
        RecomputeOutcome::Skipped { reason } => anyhow::bail!("no ranking published: {reason}"),
    };
    if let Some(mirror) = receipt.mirror {
        // Let the push finish before the runtime shuts down.
        let _ = mirror.await;
    }

    let mut record = (*receipt.record).clone();
    if let Some(field) = sort {
        let direction = if asc {
            SortDirection::Ascending
        } else {
            SortDirection::Descending
        };
        record.tasks = sorted_view(&record.tasks, field, direction);
    }
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

async fn run_watch(engine: PriorityEngine, config: &EngineConfig) -> anyhow::Result<()> {
    let engine = Arc::new(engine);
    // Held until shutdown; dropping every sender stops the runner.
    let (_triggers, rx) = trigger_channel(config.schedule.trigger_capacity);
    let cancel = CancellationToken::new();
    let interval = Duration::from_secs(config.schedule.interval_secs);

    let handle = RecomputeRunner::new(Arc::clone(&engine), interval, rx, cancel.clone()).run();

    tokio::signal::ctrl_c().await?;
    info!("interrupt received, stopping");
    cancel.cancel();
    handle.await?;
    Ok(())
}

fn parse_field(raw: &str) -> Result<SortField, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_owned()))
        .map_err(|_| format!("unknown sort field `{raw}`"))
}
