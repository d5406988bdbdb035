//! Label/value lookups in property detail tables
//!
//! Agency pages present characteristics as rows where one cell holds a
//! label ("Prezzo", "Superficie") and a sibling cell holds its value. A row
//! that does not have the exact shape described by its [`TableLayout`]
//! yields no value.

use crate::extract::clean::normalize_whitespace;
use ego_tree::NodeRef;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Node};

static LEADING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9]*([0-9.]+)").expect("static number pattern is valid"));

/// Shape of a label/value row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableLayout {
    /// Parent steps from the label's text node up to the row
    pub hops: usize,
    /// Exact number of direct children the row must have
    pub children: usize,
    /// Index of the value among the row's direct children
    pub value_index: usize,
    /// Whether whitespace-only text nodes count as children
    pub count_blank_text: bool,
}

impl TableLayout {
    fn counts(&self, node: &NodeRef<'_, Node>) -> bool {
        match node.value() {
            Node::Element(_) => true,
            Node::Text(text) => self.count_blank_text || !text.trim().is_empty(),
            _ => false,
        }
    }
}

fn label_matches(text: &str, label: &str) -> bool {
    let text = normalize_whitespace(text);
    let text = text.trim_end_matches(':').trim_end();
    text.eq_ignore_ascii_case(label)
}

fn node_text(node: NodeRef<'_, Node>) -> String {
    match node.value() {
        Node::Text(text) => normalize_whitespace(text),
        Node::Element(_) => ElementRef::wrap(node)
            .map(|element| normalize_whitespace(&element.text().collect::<String>()))
            .unwrap_or_default(),
        _ => String::new(),
    }
}

/// Finds the value paired with `label` inside `container`
///
/// Locates the first text node equal to the label (surrounding whitespace
/// and a trailing `:` ignored, ASCII case-insensitive), walks `layout.hops`
/// parents up to the row, checks the row's child count and returns the
/// trimmed text of the child at `layout.value_index`.
pub fn labeled_value(container: ElementRef<'_>, label: &str, layout: &TableLayout) -> Option<String> {
    let label_node = container.descendants().find(|node| {
        node.value()
            .as_text()
            .is_some_and(|text| label_matches(text, label))
    })?;

    let mut row = label_node;
    for _ in 0..layout.hops {
        row = row.parent()?;
    }

    let children: Vec<_> = row.children().filter(|c| layout.counts(c)).collect();
    if children.len() != layout.children {
        tracing::trace!(
            "Row for {:?} has {} children, expected {}",
            label,
            children.len(),
            layout.children
        );
        return None;
    }

    let value = node_text(*children.get(layout.value_index)?);
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Like [`labeled_value`], reading the leading numeric run of the value
/// with `.` thousands separators stripped
pub fn labeled_number(container: ElementRef<'_>, label: &str, layout: &TableLayout) -> Option<u64> {
    let value = labeled_value(container, label, layout)?;
    let digits = LEADING_NUMBER.captures(&value)?.get(1)?.as_str().replace('.', "");
    digits.parse().ok()
}
