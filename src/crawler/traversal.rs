//! Crawl traversal protocols
//!
//! A traversal turns a source's entry point into a list of extracted
//! listings. Two protocols are supported:
//! - [`SequentialPages`]: numbered index pages followed until they run dry
//! - [`PagedApi`]: a nonce-authenticated endpoint returning HTML fragments
//!   wrapped in a JSON envelope
//!
//! Parsed documents are never held across an `.await`: every page is parsed
//! in a synchronous step that returns owned data.

use crate::crawler::fetcher::Fetcher;
use crate::crawler::links::{detail_links, fragment_links};
use crate::extract::{first_match, Rule};
use crate::model::Listing;
use crate::sources::{Extractor, SourceRef};
use crate::storage::{artifact_key, ArtifactStore};
use crate::url::LinkFilter;
use crate::TraversalError;
use scraper::Html;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Everything a traversal needs from the run that launched it
#[derive(Clone)]
pub struct CrawlContext {
    pub fetcher: Fetcher,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub cancel: CancellationToken,
    /// Upper bound on index pages (or API pages) per source
    pub max_pages: u32,
}

impl CrawlContext {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Fetches one detail page, archives its markup and extracts the listing
///
/// Returns `None` when the page cannot be fetched or the extracted listing
/// violates the storage invariants.
pub async fn process_detail(
    ctx: &CrawlContext,
    url: &str,
    extractor: &dyn Extractor,
) -> Option<Listing> {
    let body = ctx.fetcher.fetch(url, &ctx.cancel).await.into_body()?;

    let key = artifact_key(url);
    let raw_html_file = ctx
        .artifacts
        .save_raw(&body, &key)
        .then(|| ctx.artifacts.location(&key));

    let source = SourceRef {
        url: url.to_string(),
        raw_html_file,
    };
    let listing = extractor.extract(&body, &source);

    match listing.validate() {
        Ok(()) => {
            tracing::debug!("Extracted {}", listing);
            Some(listing)
        }
        Err(reason) => {
            tracing::warn!("Discarding listing from {}: {}", url, reason);
            None
        }
    }
}

/// Processes `links` in order, stopping early on cancellation
async fn process_links(
    ctx: &CrawlContext,
    links: Vec<String>,
    extractor: &dyn Extractor,
    listings: &mut Vec<Listing>,
) {
    for link in links {
        if ctx.is_cancelled() {
            return;
        }
        if let Some(listing) = process_detail(ctx, &link, extractor).await {
            listings.push(listing);
        }
    }
}

/// Numbered index pages, each linking to a batch of detail pages
pub struct SequentialPages {
    /// Builds the URL of index page `n` (1-based)
    pub index_url: Box<dyn Fn(u32) -> String + Send + Sync>,
    /// Anchors considered on index pages
    pub anchor_css: &'static str,
    pub links: LinkFilter,
    /// Whether an index page advertises a following page
    pub has_next: Rule<bool>,
}

impl SequentialPages {
    /// Walks index pages 1..=max_pages
    ///
    /// Stops when a page yields no link not seen before, when it carries no
    /// next-page marker, when the page cap is reached or on cancellation.
    /// Failing to load the first index page is an error; failing later ends
    /// the traversal with what was collected so far.
    pub async fn crawl(
        &self,
        ctx: &CrawlContext,
        extractor: &dyn Extractor,
    ) -> Result<Vec<Listing>, TraversalError> {
        let mut seen = HashSet::new();
        let mut listings = Vec::new();

        for page in 1..=ctx.max_pages {
            if ctx.is_cancelled() {
                break;
            }

            let url = (self.index_url)(page);
            let Some(body) = ctx.fetcher.fetch(&url, &ctx.cancel).await.into_body() else {
                if page == 1 && !ctx.is_cancelled() {
                    return Err(TraversalError::IndexUnavailable { url });
                }
                tracing::warn!("Index page {} unavailable, stopping at {}", page, url);
                break;
            };

            let (links, has_next) = {
                let page_url = Url::parse(&url).map_err(|e| {
                    TraversalError::Protocol(format!("bad index URL {}: {}", url, e))
                })?;
                let document = Html::parse_document(&body);
                let links = detail_links(&document, &page_url, self.anchor_css, &self.links);
                (links, first_match(&document, &[self.has_next]).unwrap_or(false))
            };

            let fresh: Vec<String> = links
                .into_iter()
                .filter(|link| seen.insert(link.clone()))
                .collect();
            tracing::debug!("Index page {} yielded {} new links", page, fresh.len());

            if fresh.is_empty() {
                break;
            }

            process_links(ctx, fresh, extractor, &mut listings).await;

            if !has_next {
                tracing::debug!("No next-page marker on {}", url);
                break;
            }
        }

        Ok(listings)
    }
}

/// JSON envelope returned by the listing-data endpoint
#[derive(Debug, Deserialize)]
struct Envelope {
    success: bool,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct EnvelopePage {
    #[serde(default)]
    html: String,
    #[serde(default = "first_page")]
    current_page: u32,
    #[serde(default)]
    max_pages: u32,
}

fn first_page() -> u32 {
    1
}

/// Decodes one endpoint response into its page payload
fn decode_envelope(body: &str) -> Result<EnvelopePage, TraversalError> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|e| TraversalError::Protocol(format!("malformed envelope: {}", e)))?;
    if !envelope.success {
        return Err(TraversalError::Protocol(format!(
            "endpoint refused the request: {}",
            envelope.data
        )));
    }
    serde_json::from_value(envelope.data)
        .map_err(|e| TraversalError::Protocol(format!("malformed envelope data: {}", e)))
}

/// A paged listing endpoint guarded by a one-time nonce
pub struct PagedApi {
    /// Public page embedding the nonce
    pub index_url: String,
    /// Endpoint receiving the form POSTs
    pub endpoint: String,
    /// Value of the `action` form field
    pub action: &'static str,
    /// Fixed filter fields sent with every request
    pub filters: Vec<(String, String)>,
    /// Anchors considered inside returned fragments
    pub anchor_css: &'static str,
    pub links: LinkFilter,
    /// Rule chain locating the nonce on the index page
    pub nonce_rules: &'static [Rule<String>],
}

impl PagedApi {
    fn form(&self, nonce: &str, page: u32) -> Vec<(String, String)> {
        let mut form = vec![
            ("action".to_string(), self.action.to_string()),
            ("nonce".to_string(), nonce.to_string()),
            ("paged".to_string(), page.to_string()),
        ];
        form.extend(self.filters.iter().cloned());
        form
    }

    /// Authenticates against the index page, then pages through the endpoint
    ///
    /// A missing nonce, an unavailable index page or a failed first endpoint
    /// page is an error. A failure on a later page ends the traversal with
    /// the listings collected so far.
    pub async fn crawl(
        &self,
        ctx: &CrawlContext,
        extractor: &dyn Extractor,
    ) -> Result<Vec<Listing>, TraversalError> {
        let Some(index) = ctx
            .fetcher
            .fetch(&self.index_url, &ctx.cancel)
            .await
            .into_body()
        else {
            if ctx.is_cancelled() {
                return Ok(Vec::new());
            }
            return Err(TraversalError::IndexUnavailable {
                url: self.index_url.clone(),
            });
        };

        let nonce = {
            let document = Html::parse_document(&index);
            first_match(&document, self.nonce_rules)
        }
        .ok_or_else(|| TraversalError::MissingToken {
            url: self.index_url.clone(),
        })?;
        tracing::debug!("Obtained nonce from {}", self.index_url);

        let endpoint = Url::parse(&self.endpoint)
            .map_err(|e| TraversalError::Protocol(format!("bad endpoint {}: {}", self.endpoint, e)))?;

        let mut seen = HashSet::new();
        let mut listings = Vec::new();

        for page in 1..=ctx.max_pages {
            if ctx.is_cancelled() {
                break;
            }

            let result = ctx
                .fetcher
                .post_form(&self.endpoint, &self.form(&nonce, page), &ctx.cancel)
                .await;
            let decoded = match result.into_body() {
                Some(body) => decode_envelope(&body),
                None if ctx.is_cancelled() => break,
                None => Err(TraversalError::Protocol(format!(
                    "endpoint page {} unavailable",
                    page
                ))),
            };

            let data = match decoded {
                Ok(data) => data,
                Err(e) if page == 1 => return Err(e),
                Err(e) => {
                    tracing::warn!("Stopping {} at page {}: {}", self.endpoint, page, e);
                    break;
                }
            };

            if data.html.trim().is_empty() {
                tracing::debug!("Empty fragment on page {}", page);
                break;
            }

            let fresh: Vec<String> =
                fragment_links(&data.html, &endpoint, self.anchor_css, &self.links)
                    .into_iter()
                    .filter(|link| seen.insert(link.clone()))
                    .collect();
            tracing::debug!(
                "Endpoint page {}/{} yielded {} new links",
                data.current_page,
                data.max_pages,
                fresh.len()
            );

            process_links(ctx, fresh, extractor, &mut listings).await;

            if data.current_page >= data.max_pages {
                break;
            }
        }

        Ok(listings)
    }
}
