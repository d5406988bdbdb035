//! Domain model
//!
//! - `Listing`: canonical record extracted from a detail page
//! - `Agency`: static reference data for each scraped website
//! - `ScrapeRun`: append-only history entry written after every run

mod listing;

pub use listing::{Contract, Heating, InvalidListing, Listing};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A real-estate agency whose website is scraped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agency {
    /// Stable identifier, referenced by [`Listing::agency`]
    pub id: String,
    pub name: String,
    pub base_url: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

impl Agency {
    pub fn new(id: &str, name: &str, base_url: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            base_url: base_url.to_string(),
            phone: None,
            email: None,
            address: None,
        }
    }
}

/// One entry of the scrape history
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeRun {
    pub id: i64,
    pub run_at: DateTime<Utc>,
    pub source: String,
    pub listings: u32,
    pub duration_seconds: f64,
}

impl ScrapeRun {
    /// A run finishing now, not yet persisted (`id` is 0)
    pub fn finished_now(source: &str, listings: u32, duration_seconds: f64) -> Self {
        Self {
            id: 0,
            run_at: Utc::now(),
            source: source.to_string(),
            listings,
            duration_seconds,
        }
    }
}
