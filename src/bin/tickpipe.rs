//! Command line front end: run one emitter, print what the consumer drains.
//!
//! Run with: cargo run --bin tickpipe -- --interval-ms 50 --bound 5
//!
//! Ctrl-C triggers cancellation; `--deadline-ms` arms a timeout. Emissions go
//! to stdout, logs to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use futures::StreamExt;
use serde::Serialize;
use std::path::PathBuf;
use std::pin::pin;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tickpipe::{drain, spawn_emitter, CancellationSignal, EmitterReport, ExitReason, PipelineConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "Drain a cancellable ticking emitter through a bounded channel")]
struct Args {
    /// TOML file with interval_ms / bound / capacity / deadline_ms
    #[arg(long)]
    config: Option<PathBuf>,
    /// Tick period in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,
    /// Stop after this many emissions (default: run until cancelled)
    #[arg(long)]
    bound: Option<u64>,
    /// Channel capacity
    #[arg(long)]
    capacity: Option<usize>,
    /// Cancel automatically after this many milliseconds
    #[arg(long)]
    deadline_ms: Option<u64>,
    /// Sleep this long after each item to make the emitter feel backpressure
    #[arg(long, default_value_t = 0)]
    consumer_delay_ms: u64,
    /// Print the final summary as a JSON line
    #[arg(long)]
    json: bool,
    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    config: PipelineConfig,
    delivered: u64,
    elapsed_ms: u64,
    report: EmitterReport,
}

/// File values first, then flags on top.
fn resolve_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(interval_ms) = args.interval_ms {
        config.interval_ms = interval_ms;
    }
    if args.bound.is_some() {
        config.bound = args.bound;
    }
    if let Some(capacity) = args.capacity {
        config.capacity = capacity;
    }
    if args.deadline_ms.is_some() {
        config.deadline_ms = args.deadline_ms;
    }
    config.validate()?;
    Ok(config)
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn describe(report: &EmitterReport, delivered: u64) -> String {
    let line = format!("{delivered} delivered, {} emitted", report.emitted);
    match report.exit {
        ExitReason::BoundReached => format!("{} {line}", "done:".green().bold()),
        ExitReason::Cancelled => format!("{} {line}", "cancelled:".yellow().bold()),
        ExitReason::Disconnected => format!("{} {line}", "disconnected:".red().bold()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let config = resolve_config(&args)?;
    let root = CancellationSignal::new();
    let cancel = config.cancellation(&root);

    let shutdown = root.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupt received, stopping emitter");
                shutdown.trigger();
            }
            Err(err) => warn!(%err, "could not listen for ctrl-c"),
        }
    });

    info!(
        interval_ms = config.interval_ms,
        bound = ?config.bound,
        capacity = config.capacity,
        deadline_ms = ?config.deadline_ms,
        "starting pipeline"
    );
    let started = Instant::now();
    let handle = spawn_emitter(config.emitter()?, config.capacity, cancel)?;
    let (reader, task) = handle.into_parts();

    let consumer_delay = Duration::from_millis(args.consumer_delay_ms);
    let mut items = pin!(drain(reader));
    let mut delivered = 0u64;
    while let Some(value) = items.next().await {
        println!("{value}");
        delivered += 1;
        if !consumer_delay.is_zero() {
            sleep(consumer_delay).await;
        }
    }

    let report = task.await.context("emitter task failed")?;
    let summary = RunSummary {
        config,
        delivered,
        elapsed_ms: started.elapsed().as_millis() as u64,
        report,
    };

    if args.json {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        eprintln!("{} in {}ms", describe(&summary.report, delivered), summary.elapsed_ms);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("tickpipe").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_flags_without_config_file() {
        let config = resolve_config(&parse(&["--interval-ms", "10", "--bound", "3"])).unwrap();
        assert_eq!(config.interval_ms, 10);
        assert_eq!(config.bound, Some(3));
        assert_eq!(config.capacity, 1);
        assert_eq!(config.deadline_ms, None);
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "interval_ms = 100\nbound = 9\ncapacity = 2").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = resolve_config(&parse(&["--config", &path, "--bound", "4"])).unwrap();
        assert_eq!(config.interval_ms, 100);
        assert_eq!(config.bound, Some(4));
        assert_eq!(config.capacity, 2);
    }

    #[test]
    fn test_invalid_flag_value_is_rejected() {
        assert!(resolve_config(&parse(&["--capacity", "0"])).is_err());
    }

    #[test]
    fn test_summary_serializes_exit_reason() {
        let summary = RunSummary {
            config: PipelineConfig::default(),
            delivered: 0,
            elapsed_ms: 50,
            report: EmitterReport {
                emitted: 0,
                bound: None,
                exit: ExitReason::Cancelled,
            },
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["report"]["exit"], "cancelled");
        assert_eq!(json["config"]["capacity"], 1);
    }

    #[test]
    fn test_describe_mentions_counts() {
        let report = EmitterReport {
            emitted: 5,
            bound: Some(5),
            exit: ExitReason::BoundReached,
        };
        assert!(describe(&report, 5).contains("5 delivered, 5 emitted"));
    }
}
