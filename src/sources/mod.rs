//! Supported agency websites
//!
//! Each source pairs a crawl traversal protocol with an extractor for its
//! detail-page markup. The coordinator only sees the [`Source`] trait.

mod galileo;
mod tettorosso;

pub use galileo::{GalileoExtractor, GalileoSource};
pub use tettorosso::{TettorossoExtractor, TettorossoSource};

use crate::config::{Config, SourceKind};
use crate::crawler::CrawlContext;
use crate::model::{Agency, Listing};
use crate::HomefinderError;
use async_trait::async_trait;
use std::sync::Arc;

/// Where a piece of markup came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    /// URL the markup was fetched from
    pub url: String,
    /// Location of the archived raw markup, if it was saved
    pub raw_html_file: Option<String>,
}

impl SourceRef {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            raw_html_file: None,
        }
    }
}

/// Turns one detail page into a listing
///
/// Extraction never fails: fields whose markers are missing stay absent.
pub trait Extractor: Send + Sync {
    fn extract(&self, markup: &str, source: &SourceRef) -> Listing;
}

/// One scraped website
#[async_trait]
pub trait Source: Send + Sync {
    /// Stable short name, also the agency identifier
    fn name(&self) -> &str;

    /// Static agency record for this website
    fn agency(&self) -> Agency;

    /// Runs the website's traversal and returns the extracted listings
    async fn crawl(&self, ctx: &CrawlContext) -> Result<Vec<Listing>, HomefinderError>;
}

/// Builds the enabled sources of a configuration, in configuration order
pub fn build_sources(config: &Config) -> Result<Vec<Arc<dyn Source>>, HomefinderError> {
    let mut sources: Vec<Arc<dyn Source>> = Vec::new();

    for entry in config.sources.iter().filter(|s| s.enabled) {
        let source: Arc<dyn Source> = match entry.kind {
            SourceKind::Tettorosso => Arc::new(TettorossoSource::new(&entry.base_url)?),
            SourceKind::Galileo => Arc::new(GalileoSource::new(&entry.base_url)?),
        };
        tracing::debug!("Configured source {} at {}", source.name(), entry.base_url);
        sources.push(source);
    }

    Ok(sources)
}
