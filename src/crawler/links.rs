//! Detail-link discovery for index pages and listing fragments
//!
//! Links are taken from `<a href>` tags only; download links and non-HTTP
//! schemes are skipped. Order of first appearance is preserved.

use crate::extract::selector;
use crate::url::{resolve_link, same_origin, LinkFilter};
use scraper::Html;
use std::collections::HashSet;
use url::Url;

/// Collects the detail-page links of a parsed page
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags matching `anchor_css`, resolved against `page_url`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links and data URIs
/// - Links to another origin than `page_url`
/// - Links rejected by `filter`
/// - The page itself
pub fn detail_links(
    document: &Html,
    page_url: &Url,
    anchor_css: &str,
    filter: &LinkFilter,
) -> Vec<String> {
    let Some(anchors) = selector(anchor_css) else {
        return Vec::new();
    };

    let own = page_url.as_str();
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&anchors) {
        if element.value().attr("download").is_some() {
            continue;
        }
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(absolute) = resolve_link(href, page_url) else {
            continue;
        };

        let same_site = Url::parse(&absolute)
            .map(|parsed| same_origin(&parsed, page_url))
            .unwrap_or(false);
        if !same_site || absolute == own || !filter.matches(&absolute) {
            continue;
        }

        if seen.insert(absolute.clone()) {
            links.push(absolute);
        }
    }

    links
}

/// Convenience function for extracting links from a standalone HTML fragment
pub fn fragment_links(
    fragment: &str,
    page_url: &Url,
    anchor_css: &str,
    filter: &LinkFilter,
) -> Vec<String> {
    let document = Html::parse_fragment(fragment);
    detail_links(&document, page_url, anchor_css, filter)
}
