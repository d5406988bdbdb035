//! Crawler module for scraping agency websites
//!
//! This module contains the core scraping logic, including:
//! - HTTP fetching with retry logic and politeness delays
//! - Detail-link discovery
//! - The crawl traversal protocols (sequential pages, paged API)
//! - Run coordination and the background loop

mod coordinator;
mod fetcher;
mod flags;
mod links;
mod traversal;

pub use coordinator::BackgroundScraper;
pub use fetcher::{build_http_client, FetchResult, Fetcher};
pub use flags::{RunFlags, RunGuard};
pub use links::{detail_links, fragment_links};
pub use traversal::{process_detail, CrawlContext, PagedApi, SequentialPages};

use crate::config::Config;
use crate::sources::build_sources;
use crate::storage::{open_storage, share, FsArtifactStore};
use crate::HomefinderError;
use std::path::Path;
use std::sync::Arc;

/// Builds a background scraper from a configuration
///
/// This is the main entry point for wiring a scraper. It will:
/// 1. Open (or create) the listing database
/// 2. Build the HTTP fetcher
/// 3. Build the enabled sources
/// 4. Seed the agency records
///
/// # Arguments
///
/// * `config` - The scraper configuration
///
/// # Returns
///
/// * `Ok(BackgroundScraper)` - Ready to `run_once` or `start`
/// * `Err(HomefinderError)` - Storage or client initialization failed
pub fn build_scraper(config: &Config) -> Result<BackgroundScraper, HomefinderError> {
    let storage = open_storage(
        Path::new(&config.storage.database_path),
        config.storage.history_retention as usize,
    )?;
    let fetcher = Fetcher::new(&config.scraper)?;
    let sources = build_sources(config)?;
    let artifacts = Arc::new(FsArtifactStore::new(&config.storage.raw_html_dir));

    tracing::info!(
        "Scraper configured with {} sources, database {}",
        sources.len(),
        config.storage.database_path
    );

    Ok(BackgroundScraper::new(
        sources,
        share(storage),
        fetcher,
        artifacts,
        config.schedule.clone(),
        config.scraper.max_pages,
    ))
}
