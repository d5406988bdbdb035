//! Normalisation of the free-text amounts found in listing markup
//!
//! Amounts use Italian formatting: `.` groups thousands and `,` separates
//! decimals, e.g. `€ 1.250,50`.

use once_cell::sync::Lazy;
use regex::Regex;

static DECIMAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+(?:\.[0-9]+)?").expect("static decimal pattern is valid"));

const YES_WORDS: &[&str] = &["si", "sì", "yes", "presente", "true"];
const NO_WORDS: &[&str] = &["no", "assente", "non presente", "false"];

/// Collapses every run of whitespace to a single space and trims the ends
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extracts the first numeric token after Italian-format normalisation
///
/// Strips `€`, removes `.` thousands separators and turns the `,` decimal
/// separator into `.` before matching.
pub fn parse_decimal(text: &str) -> Option<f64> {
    let normalized = text.replace('€', "").replace('.', "").replace(',', ".");
    DECIMAL
        .find(&normalized)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Cleans a price; absent or unparseable amounts resolve to `0.0`
///
/// ```
/// use homefinder::extract::clean_price;
///
/// assert_eq!(clean_price(Some("€ 150.000")), 150000.0);
/// assert_eq!(clean_price(None), 0.0);
/// ```
pub fn clean_price(text: Option<&str>) -> f64 {
    text.and_then(parse_decimal).unwrap_or(0.0)
}

/// Cleans a floor area to whole square meters; absent resolves to `None`
pub fn clean_area(text: Option<&str>) -> Option<u32> {
    let value = parse_decimal(text?)?;
    if value < 0.0 || value > u32::MAX as f64 {
        return None;
    }
    Some(value.trunc() as u32)
}

/// Reads a yes/no flag such as "Sì", "No" or "Presente"
pub fn parse_yes_no(text: &str) -> Option<bool> {
    let lower = normalize_whitespace(text).to_lowercase();
    if NO_WORDS.contains(&lower.as_str()) {
        Some(false)
    } else if YES_WORDS.contains(&lower.as_str()) {
        Some(true)
    } else {
        None
    }
}
