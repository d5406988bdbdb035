//! HomeFinder main entry point
//!
//! This is the command-line interface for the HomeFinder listing scraper.

use anyhow::Context;
use clap::Parser;
use homefinder::config::{load_config_with_hash, Config};
use homefinder::crawler::build_scraper;
use homefinder::storage::{open_storage, Storage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Number of scrape runs shown by --stats
const RECENT_RUNS: usize = 10;

/// HomeFinder: a polite real-estate listing scraper
///
/// HomeFinder periodically scrapes the configured agency websites, extracts
/// structured listings and keeps them up to date in a SQLite database.
#[derive(Parser, Debug)]
#[command(name = "homefinder")]
#[command(version = "1.0.0")]
#[command(about = "A polite real-estate listing scraper", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Run a single scrape and exit instead of starting the background loop
    #[arg(long, conflicts_with = "stats")]
    once: bool,

    /// With --once: scrape even if the minimum interval has not elapsed
    #[arg(long, requires = "once")]
    force: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "once")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.stats {
        handle_stats(&config)
    } else if cli.once {
        handle_once(&config, cli.force).await
    } else {
        handle_background(&config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("homefinder=info,warn"),
            1 => EnvFilter::new("homefinder=debug,info"),
            2 => EnvFilter::new("homefinder=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --stats mode: shows listings, agencies and recent runs
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let storage = open_storage(
        Path::new(&config.storage.database_path),
        config.storage.history_retention as usize,
    )
    .context("Failed to open database")?;

    println!("Listings: {}", storage.count_listings()?);

    let agencies = storage.get_agencies()?;
    println!("\nAgencies ({}):", agencies.len());
    for agency in &agencies {
        println!("  - {} ({}): {}", agency.name, agency.id, agency.base_url);
    }

    let runs = storage.recent_runs(RECENT_RUNS)?;
    println!("\nRecent runs ({}):", runs.len());
    for run in &runs {
        println!(
            "  {}  {:<24} {:>5} listings  {:>7.1}s",
            run.run_at.format("%Y-%m-%d %H:%M:%S"),
            run.source,
            run.listings,
            run.duration_seconds
        );
    }

    Ok(())
}

/// Handles the --once mode: a single scrape run
async fn handle_once(config: &Config, force: bool) -> anyhow::Result<()> {
    let scraper = build_scraper(config).context("Failed to initialize scraper")?;

    if !scraper.should_run(force) {
        println!("No run due yet (use --force to scrape anyway)");
        return Ok(());
    }

    let count = scraper.run_once(force).await;
    println!("✓ Stored {} listings", count);

    Ok(())
}

/// Handles the default mode: background loop until Ctrl-C
async fn handle_background(config: &Config) -> anyhow::Result<()> {
    let scraper = Arc::new(build_scraper(config).context("Failed to initialize scraper")?);

    scraper.start();
    tracing::info!(
        "Scraping every {} minutes, press Ctrl-C to stop",
        config.schedule.interval_minutes
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    tracing::info!("Shutdown requested, waiting for the current run to stop");
    if !scraper.stop().await {
        tracing::warn!("Background loop did not shut down cleanly");
    }

    Ok(())
}
