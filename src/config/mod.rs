//! Configuration module for HomeFinder
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use homefinder::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("homefinder.toml")).unwrap();
//! println!("Scraping every {} minutes", config.schedule.interval_minutes);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, ScheduleConfig, ScraperConfig, SourceEntry, SourceKind, StorageConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
