//! URL handling module for HomeFinder
//!
//! This module resolves hrefs found in listing markup to absolute URLs and
//! decides which of them point at listing detail pages.

use regex::Regex;
use url::Url;

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
///
/// The fragment of the resolved URL is dropped so that anchors on the same
/// detail page collapse to one URL.
///
/// # Examples
///
/// ```
/// use homefinder::url::resolve_link;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/immobili.php?start=0").unwrap();
/// assert_eq!(
///     resolve_link("/immobili/villa/#foto", &base).as_deref(),
///     Some("https://example.com/immobili/villa/")
/// );
/// assert_eq!(resolve_link("mailto:info@example.com", &base), None);
/// ```
pub fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    let mut absolute = base_url.join(href).ok()?;
    if absolute.scheme() != "http" && absolute.scheme() != "https" {
        return None;
    }
    absolute.set_fragment(None);

    Some(absolute.to_string())
}

/// Decides whether an absolute URL is a listing detail page
#[derive(Debug, Clone)]
pub struct LinkFilter {
    pattern: Regex,
    excluded: Vec<String>,
}

impl LinkFilter {
    /// Creates a filter accepting URLs matching `pattern` that contain none of
    /// the `excluded` fragments (compared case-insensitively)
    pub fn new(pattern: Regex, excluded: &[&str]) -> Self {
        Self {
            pattern,
            excluded: excluded.iter().map(|s| s.to_ascii_lowercase()).collect(),
        }
    }

    pub fn matches(&self, url: &str) -> bool {
        if !self.pattern.is_match(url) {
            return false;
        }
        let lower = url.to_ascii_lowercase();
        !self.excluded.iter().any(|ex| lower.contains(ex.as_str()))
    }
}

/// Parses a site base URL as a directory, so that relative joins keep its
/// path prefix (`https://a.it/agenzia` joins to `https://a.it/agenzia/x`)
///
/// Query and fragment are dropped.
pub fn site_root(base_url: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base_url)?;
    url.set_query(None);
    url.set_fragment(None);
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Returns true if both URLs share scheme, host and port
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
}
