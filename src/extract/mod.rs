//! Extraction helpers shared by the per-source extractors
//!
//! Every listing field is resolved by an ordered chain of [`Rule`]s: small
//! pure functions that look for one structural marker in the parsed page and
//! return `None` when it is not there. [`first_match`] evaluates a chain and
//! yields the first hit, so a missing marker never fails the whole record.

pub mod clean;
pub mod table;

use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

pub use clean::{clean_area, clean_price, normalize_whitespace, parse_decimal, parse_yes_no};
pub use table::{labeled_number, labeled_value, TableLayout};

/// A single structural extraction rule
pub type Rule<T> = fn(&Html) -> Option<T>;

/// Evaluates `rules` in order and returns the first value produced
pub fn first_match<T>(document: &Html, rules: &[Rule<T>]) -> Option<T> {
    rules.iter().find_map(|rule| rule(document))
}

/// Parses a CSS selector, logging (rather than failing on) a bad one
pub fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            tracing::error!("Invalid selector {:?}: {:?}", css, e);
            None
        }
    }
}

/// Whitespace-normalized text content of an element
pub fn element_text(element: ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<String>())
}

/// Text of the first element matching `css` whose text is non-empty
pub fn select_text(document: &Html, css: &str) -> Option<String> {
    let selector = selector(css)?;
    document
        .select(&selector)
        .map(element_text)
        .find(|text| !text.is_empty())
}

/// Texts of every element matching `css`, empty ones dropped
pub fn select_all_text(document: &Html, css: &str) -> Vec<String> {
    let Some(selector) = selector(css) else {
        return Vec::new();
    };
    document
        .select(&selector)
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect()
}

/// First element matching `css`
pub fn select_first<'a>(document: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let selector = selector(css)?;
    document.select(&selector).next()
}

/// Trimmed, non-empty value of `attr` on the first element matching `css`
/// that carries it
pub fn select_attr(document: &Html, css: &str, attr: &str) -> Option<String> {
    let selector = selector(css)?;
    document
        .select(&selector)
        .filter_map(|element| element.value().attr(attr))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

/// Content of a `<meta property=...>` or `<meta name=...>` tag
pub fn meta_content(document: &Html, key: &str) -> Option<String> {
    select_attr(document, &format!(r#"meta[property="{key}"]"#), "content")
        .or_else(|| select_attr(document, &format!(r#"meta[name="{key}"]"#), "content"))
}

/// Text lines of `element`, skipping the subtrees matching `exclude_css`
/// as well as scripts and styles
///
/// Each non-blank text node becomes one whitespace-normalized line.
pub fn text_excluding(element: ElementRef<'_>, exclude_css: &str) -> String {
    let mut skipped = HashSet::new();
    if let Some(exclude) = selector(&format!("{exclude_css}, script, style")) {
        skipped.extend(element.select(&exclude).map(|e| e.id()));
    }

    element
        .descendants()
        .filter(|node| !node.ancestors().any(|a| skipped.contains(&a.id())))
        .filter_map(|node| node.value().as_text().map(|t| normalize_whitespace(t)))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
