use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Contract kind of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Contract {
    Sell,
    Rent,
}

/// Words that mark a listing as for sale. Tested before [`RENT_WORDS`].
///
/// Matched as whole words only: "sale" alone is Italian for "rooms" and
/// "rent" hides inside "Trento" or "corrente".
const SELL_WORDS: &[&str] = &["vendita", "vendesi", "sell", "for sale"];

/// Words that mark a listing as for rent
const RENT_WORDS: &[&str] = &["affitto", "affittasi", "locazione", "for rent", "to rent"];

static SELL_PATTERN: Lazy<Regex> = Lazy::new(|| vocabulary_pattern(SELL_WORDS));
static RENT_PATTERN: Lazy<Regex> = Lazy::new(|| vocabulary_pattern(RENT_WORDS));

/// Case-insensitive whole-word alternation over `words`
fn vocabulary_pattern(words: &[&str]) -> Regex {
    let alternation = words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).expect("vocabulary pattern is valid")
}

impl Contract {
    /// Classifies free text by case-insensitive whole-word match
    ///
    /// Sale vocabulary wins over rent vocabulary, and text matching neither
    /// defaults to [`Contract::Sell`].
    pub fn classify(text: &str) -> Self {
        Self::match_vocabulary(text).unwrap_or(Self::Sell)
    }

    /// Like [`Contract::classify`] but returns `None` when no word matches
    pub fn match_vocabulary(text: &str) -> Option<Self> {
        if SELL_PATTERN.is_match(text) {
            Some(Self::Sell)
        } else if RENT_PATTERN.is_match(text) {
            Some(Self::Rent)
        } else {
            None
        }
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Sell => "sell",
            Self::Rent => "rent",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "sell" => Some(Self::Sell),
            "rent" => Some(Self::Rent),
            _ => None,
        }
    }
}

impl fmt::Display for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Heating type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Heating {
    Autonomous,
    Centralized,
    Unknown,
}

const AUTONOMOUS_WORDS: &[&str] = &["autonomo", "autonomous"];
const CENTRALIZED_WORDS: &[&str] = &["centralizzato", "centralized"];

impl Heating {
    /// Classifies free text by case-insensitive substring match, defaulting
    /// to [`Heating::Unknown`]
    pub fn classify(text: &str) -> Self {
        let lower = text.to_lowercase();
        if AUTONOMOUS_WORDS.iter().any(|w| lower.contains(w)) {
            Self::Autonomous
        } else if CENTRALIZED_WORDS.iter().any(|w| lower.contains(w)) {
            Self::Centralized
        } else {
            Self::Unknown
        }
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Autonomous => "autonomous",
            Self::Centralized => "centralized",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "autonomous" => Some(Self::Autonomous),
            "centralized" => Some(Self::Centralized),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for Heating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// A property listing extracted from one detail page
///
/// `url` is the natural key: storing a listing whose URL already exists
/// updates the existing record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    // Basic information
    pub title: String,
    /// Identifier of the [`Agency`](crate::model::Agency) publishing the listing
    pub agency: String,
    pub url: String,
    pub description: String,

    // Financial information
    pub contract: Contract,
    pub price: f64,

    // Location
    pub city: String,
    pub neighborhood: Option<String>,
    pub address: Option<String>,

    // Physical characteristics
    pub rooms: Option<u32>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub square_meters: Option<u32>,
    pub floor: Option<String>,
    pub year_built: Option<i32>,

    // Amenities
    pub has_elevator: Option<bool>,
    pub heating: Option<Heating>,
    pub has_air_conditioning: Option<bool>,
    pub has_garage: Option<bool>,
    pub is_furnished: Option<bool>,

    // Energy
    pub energy_class: Option<String>,
    pub energy_consumption: Option<f64>,

    pub features: Option<Vec<String>>,

    // Metadata
    pub scrape_date: DateTime<Utc>,
    pub publication_date: Option<DateTime<Utc>>,
    /// Location of the raw markup this listing was extracted from
    pub raw_html_file: Option<String>,
    /// The agency's own reference code
    pub code: Option<String>,
}

/// Reasons a listing is refused before it reaches storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidListing {
    EmptyUrl,
    NegativePrice,
}

impl fmt::Display for InvalidListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyUrl => write!(f, "listing has an empty URL"),
            Self::NegativePrice => write!(f, "listing has a negative or NaN price"),
        }
    }
}

impl Listing {
    /// Creates a listing with every optional field absent
    pub fn new(agency: &str, url: &str) -> Self {
        Self {
            title: String::new(),
            agency: agency.to_string(),
            url: url.to_string(),
            description: String::new(),
            contract: Contract::Sell,
            price: 0.0,
            city: String::new(),
            neighborhood: None,
            address: None,
            rooms: None,
            bedrooms: None,
            bathrooms: None,
            square_meters: None,
            floor: None,
            year_built: None,
            has_elevator: None,
            heating: None,
            has_air_conditioning: None,
            has_garage: None,
            is_furnished: None,
            energy_class: None,
            energy_consumption: None,
            features: None,
            scrape_date: Utc::now(),
            publication_date: None,
            raw_html_file: None,
            code: None,
        }
    }

    /// Checks the invariants every stored listing must satisfy
    pub fn validate(&self) -> Result<(), InvalidListing> {
        if self.url.trim().is_empty() {
            return Err(InvalidListing::EmptyUrl);
        }
        // NaN fails this comparison as well
        if !(self.price >= 0.0) {
            return Err(InvalidListing::NegativePrice);
        }
        Ok(())
    }
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Listing(title='{}', price={}, m2={:?}, url={})",
            self.title, self.price, self.square_meters, self.url
        )
    }
}
