//! Storage traits and error types
//!
//! This module defines the trait interfaces for the listing store and the
//! raw-markup artifact store, and the associated error types.

use crate::model::{Agency, Listing, ScrapeRun};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid listing {url}: {reason}")]
    InvalidRecord { url: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for listing storage backends
///
/// Per-URL atomicity is the backend's responsibility: concurrent workers
/// upsert different URLs through a shared handle.
pub trait Storage {
    // ===== Listings =====

    /// Inserts the listing, or updates the record with the same URL
    ///
    /// # Returns
    ///
    /// The stable identifier of the stored record
    fn save_listing(&mut self, listing: &Listing) -> StorageResult<i64>;

    /// Upserts every listing, skipping (and logging) the ones that fail
    ///
    /// # Returns
    ///
    /// The number of listings stored
    fn save_listings(&mut self, listings: &[Listing]) -> usize {
        let mut saved = 0;
        for listing in listings {
            match self.save_listing(listing) {
                Ok(_) => saved += 1,
                Err(e) => tracing::warn!("Skipping listing {}: {}", listing.url, e),
            }
        }
        tracing::debug!("Stored {}/{} listings", saved, listings.len());
        saved
    }

    /// Gets a listing by its URL
    fn get_listing_by_url(&self, url: &str) -> StorageResult<Option<Listing>>;

    /// Gets total listing count
    fn count_listings(&self) -> StorageResult<u64>;

    // ===== Scrape history =====

    /// Timestamp of the most recent scrape run, if any
    fn get_last_run_time(&self) -> StorageResult<Option<DateTime<Utc>>>;

    /// Appends a run to the history and applies the retention policy
    fn record_run(&mut self, run: &ScrapeRun) -> StorageResult<i64>;

    /// Appends a run finishing now
    fn log_run(&mut self, source: &str, count: usize, duration_secs: f64) -> StorageResult<i64> {
        let listings = u32::try_from(count).unwrap_or(u32::MAX);
        self.record_run(&ScrapeRun::finished_now(source, listings, duration_secs))
    }

    /// Most recent runs, newest first
    fn recent_runs(&self, limit: usize) -> StorageResult<Vec<ScrapeRun>>;

    // ===== Agencies =====

    /// Inserts or refreshes the static agency records
    fn seed_agencies(&mut self, agencies: &[Agency]) -> StorageResult<()>;

    /// Gets all agencies, ordered by id
    fn get_agencies(&self) -> StorageResult<Vec<Agency>>;
}

/// Persists raw page markup so extraction can be re-run without re-fetching
pub trait ArtifactStore: Send + Sync {
    /// Stores `markup` under `key`, returning whether it was written
    fn save_raw(&self, markup: &str, key: &str) -> bool;

    /// Where the artifact for `key` lives, as recorded on the listing
    fn location(&self, key: &str) -> String;
}
