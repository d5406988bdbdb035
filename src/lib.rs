//! HomeFinder: a polite real-estate listing scraper
//!
//! This crate periodically crawls a fixed set of real-estate agency websites,
//! extracts structured listings from their (inconsistent) markup and upserts
//! them into a SQLite database, one run at a time.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod model;
pub mod sources;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for HomeFinder operations
#[derive(Debug, Error)]
pub enum HomefinderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Traversal error: {0}")]
    Traversal(#[from] TraversalError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised by a source's crawl traversal protocol
///
/// These stop the traversal of one source; they never abort other sources.
#[derive(Debug, Error)]
pub enum TraversalError {
    #[error("No authorization token found on {url}")]
    MissingToken { url: String },

    #[error("Index page unavailable: {url}")]
    IndexUnavailable { url: String },

    #[error("Listing endpoint protocol error: {0}")]
    Protocol(String),
}

/// Result type alias for HomeFinder operations
pub type Result<T> = std::result::Result<T, HomefinderError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::BackgroundScraper;
pub use model::{Agency, Contract, Heating, Listing, ScrapeRun};
