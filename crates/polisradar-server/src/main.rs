//! polisradard: polls the polisen.se events feed and prints per-area
//! readings as JSON lines whenever a refresh publishes a new snapshot.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{Level, warn};

use polisradar_core::{MatchMode, TracingConfig, TracingOutputFormat, init_tracing};
use polisradar_feed::{DetailEnricher, PolisenClient};
use polisradar_server::{
    Aggregator, AreaAdapter, CombinedAdapter, RadarConfig, RefreshCoordinator,
};

#[derive(Debug, Parser)]
#[command(
    name = "polisradard",
    about = "Polls the polisen.se events feed and emits per-area summaries"
)]
struct Cli {
    /// Area specification, e.g. "Malmö / Eslöv". Empty matches everything.
    #[arg(long, default_value = "")]
    area: String,

    /// Matching mode: "contains" or "exact".
    #[arg(long, default_value = "contains")]
    match_mode: MatchMode,

    /// Time window in hours (1-168).
    #[arg(long, default_value_t = 24)]
    hours: u32,

    /// Maximum events kept per area (0-50); today's events are always kept.
    #[arg(long, default_value_t = 5)]
    max_items: usize,

    /// Minutes between refreshes (1-60).
    #[arg(long, default_value_t = 5)]
    interval: u64,

    /// Also emit the combined all-areas reading.
    #[arg(long)]
    combined: bool,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,

    /// Emit logs as JSON.
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut tracing_config = TracingConfig::default();
    if cli.debug {
        tracing_config = tracing_config.with_level(Level::DEBUG);
    }
    if cli.json_logs {
        tracing_config = tracing_config.with_format(TracingOutputFormat::Json);
    }
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("error: {e}");
        return ExitCode::FAILURE;
    }

    let config = RadarConfig::new(cli.area)
        .with_match_mode(cli.match_mode)
        .with_hours(cli.hours)
        .with_max_items(cli.max_items)
        .with_update_interval_minutes(cli.interval);
    if let Err(e) = config.validate() {
        eprintln!("error: {e}");
        return ExitCode::FAILURE;
    }

    let client = PolisenClient::new();
    let enricher = Arc::new(DetailEnricher::new(client.clone()));
    let aggregator = Aggregator::new(config.clone(), Arc::new(client), enricher);

    let coordinator = RefreshCoordinator::new(config.update_interval());
    let handle = coordinator.handle();

    let adapters: Vec<AreaAdapter> = config
        .areas()
        .into_iter()
        .map(|area| AreaAdapter::new(area, config.clone()))
        .collect();
    let combined = CombinedAdapter::new(config.clone());

    let mut snapshots = handle.subscribe();
    let runner = tokio::spawn(coordinator.run(aggregator));

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let Some(snapshot) = snapshots.borrow_and_update().clone() else {
                    continue;
                };
                for adapter in &adapters {
                    emit(serde_json::to_string(&adapter.read(&snapshot)));
                }
                if cli.combined {
                    emit(serde_json::to_string(&combined.read(&snapshot)));
                }
            }
            _ = tokio::signal::ctrl_c() => {
                let _ = handle.stop().await;
                break;
            }
        }
    }

    let _ = runner.await;
    ExitCode::SUCCESS
}

fn emit(line: Result<String, serde_json::Error>) {
    match line {
        Ok(line) => println!("{line}"),
        Err(e) => warn!(error = %e, "failed to serialize reading"),
    }
}
