mod config;
mod database;
mod display;
mod download;
mod events;
mod parser;
mod propagation;
mod tracking;
mod tui;
mod update;

use anyhow::{Context, Result};
use clap::Parser;
use config::{Cli, Config};
use database::Database;
use display::Presenter;
use download::HttpFetcher;
use events::ConsoleSink;
use propagation::Sgp4Propagator;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use tracking::TrackedSatellites;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.gui);

    let config = Config::from_cli(cli)?;
    debug!("Configuration: {:?}", config);

    let mut db = Database::open(&config.db_path)
        .with_context(|| format!("cannot open store '{}'", config.db_path.display()))?;

    if let Some(list) = &config.sources {
        let summary = update::run_update(
            list,
            &mut db,
            &HttpFetcher::new(),
            &ConsoleSink::new(config.verbose),
        )?;
        info!(
            "Update finished: {} sources ({} unreachable), {} parsed, {} stored, {} diagnostics",
            summary.sources,
            summary.failed_sources,
            summary.parsed,
            summary.stored,
            summary.diagnostics
        );
    }

    debug!("{} records in store", db.count()?);
    let records = db.fetch_records()?;
    let (mut sats, failures) =
        TrackedSatellites::from_records(config.observer, Sgp4Propagator, records);
    if !failures.is_empty() {
        warn!("{} of {} objects could not be propagated", failures.len(), sats.len());
        for failure in &failures {
            debug!("{}", failure);
        }
    }

    Presenter::from_config(&config).render(&mut sats)
}

/// Logs go to stderr. `RUST_LOG` overrides the level picked from the flags.
fn init_logging(verbose: bool, interactive: bool) {
    let default_level = match (verbose, interactive) {
        // Anything below warn would scribble over the full-screen view.
        (_, true) => "warn",
        (true, false) => "debug",
        (false, false) => "info",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
