//! tidepoold — the Tidepool daemon.
//!
//! Runs one `HorizontalScaler` against a JSON load feed until Ctrl-C,
//! logging scaling status periodically and optionally exporting the
//! collected history on exit.
//!
//! # Usage
//!
//! ```text
//! tidepoold run --config tidepool.toml --load-file load.json --export-on-exit out.json
//! tidepoold inspect --export out.json
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use tidepool_metrics::JsonFileLoadProvider;
use tidepool_scaler::{load_export, HorizontalScaler, ScalerConfig};

#[derive(Parser)]
#[command(name = "tidepoold", about = "Tidepool horizontal scaling daemon")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the scaling loop until interrupted.
    Run {
        /// Scaler configuration (TOML).
        #[arg(long, default_value = "tidepool.toml")]
        config: PathBuf,

        /// JSON file holding the current system load; re-read every iteration.
        #[arg(long)]
        load_file: PathBuf,

        /// Write the metrics export here on shutdown.
        #[arg(long)]
        export_on_exit: Option<PathBuf>,

        /// Seconds between status log lines.
        #[arg(long, default_value = "60")]
        status_interval: u64,
    },
    /// Summarize a previously written export.
    Inspect {
        /// Export file produced by `run --export-on-exit`.
        #[arg(long)]
        export: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Run {
            config,
            load_file,
            export_on_exit,
            status_interval,
        } => run(config, load_file, export_on_exit, status_interval).await,
        Command::Inspect { export } => inspect(export),
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new("info,tidepoold=debug,tidepool=debug")
    });
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(
    config_path: PathBuf,
    load_file: PathBuf,
    export_on_exit: Option<PathBuf>,
    status_interval: u64,
) -> anyhow::Result<()> {
    let config = ScalerConfig::from_file(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    info!(
        path = %config_path.display(),
        min = config.scaling.min_instances,
        max = config.scaling.max_instances,
        "configuration loaded"
    );

    let provider = Arc::new(JsonFileLoadProvider::new(&load_file));
    let scaler = HorizontalScaler::new(config, provider)?;
    info!(load_file = %load_file.display(), "Tidepool daemon starting");

    if !scaler.start_monitoring() {
        anyhow::bail!("scaling monitoring failed to start");
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(status_interval.max(1)));
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let status = scaler.scaling_status();
                let health = scaler.health_report();
                info!(
                    status = %status.status,
                    current = status.current_instances,
                    target = status.target_instances,
                    decisions = status.recent_decision_count,
                    health_score = health.health_score,
                    "scaling status"
                );
            }
            result = tokio::signal::ctrl_c() => {
                result.context("installing Ctrl-C handler")?;
                info!("shutdown signal received");
                break;
            }
        }
    }

    scaler.stop_monitoring().await;

    if let Some(path) = export_on_exit
        && !scaler.export_metrics(&path)
    {
        warn!(path = %path.display(), "exit export was not written");
    }

    info!("Tidepool daemon stopped");
    Ok(())
}

fn inspect(path: PathBuf) -> anyhow::Result<()> {
    let export = load_export(&path)?;
    let summary = serde_json::json!({
        "export_timestamp": export.export_timestamp,
        "metrics": export.metrics_history.len(),
        "decisions": export.decision_history.len(),
        "alerts": export.alerts.len(),
        "patterns": export.patterns,
        "latest": export.metrics_history.last(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
