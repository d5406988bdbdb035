//! Tetto Rosso Immobiliare
//!
//! Numbered index pages (`immobili.php?...&start=N`) link to detail pages
//! under `/immobili/<slug>/`. Characteristics sit in a two-cell table inside
//! `#caratt`.

use crate::crawler::{CrawlContext, SequentialPages};
use crate::extract::{
    clean_area, clean_price, first_match, labeled_number, labeled_value, select_attr,
    select_first, select_text, selector, text_excluding, TableLayout,
};
use crate::model::{Agency, Contract, Heating, Listing};
use crate::sources::{Extractor, Source, SourceRef};
use crate::url::{site_root, LinkFilter};
use crate::HomefinderError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};
use url::Url;

const AGENCY_ID: &str = "tettorosso";
const AGENCY_NAME: &str = "Tetto Rosso Immobiliare";
const TITLE_SUFFIX: &str = " | Tetto Rosso Immobiliare";

/// Listings per index page
const PAGE_SIZE: u32 = 12;

const EXCLUDED_PATHS: &[&str] = &["contatti", "privacy", "cookie", "lavora-con-noi", "wishlist"];

/// `<tr> <td><span>Label</span></td> <td>Value</td> </tr>`, blank text counted
const TABLE: TableLayout = TableLayout {
    hops: 3,
    children: 5,
    value_index: 3,
    count_blank_text: true,
};

static DETAIL_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/immobili/[^/?#]+/?$").expect("static detail pattern is valid"));

static ENERGY_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"classe_energetica/([A-G][1-5]?)\.png").expect("static energy pattern is valid")
});

const INDEX_PATH: &str = "immobili.php";

/// URL of index page `page` (1-based) under the index script `index`
fn index_url(index: &Url, page: u32) -> String {
    let mut url = index.clone();
    url.query_pairs_mut()
        .append_pair("azione", "list")
        .append_pair("id_categorianews", "1")
        .append_pair("start", &(page.saturating_sub(1) * PAGE_SIZE).to_string());
    url.to_string()
}

/// Next-page arrow: an `i.fa-chevron-right` inside a link back to the index
fn has_next_page(document: &Html) -> Option<bool> {
    let anchors = selector(r#"a[href*="immobili.php"]"#)?;
    let chevron = selector("i.fa-chevron-right")?;
    Some(
        document
            .select(&anchors)
            .any(|a| a.select(&chevron).next().is_some()),
    )
}

// ===== Field rules =====

fn title_tag(document: &Html) -> Option<String> {
    let title = select_text(document, "title")?;
    let title = title.replace(TITLE_SUFFIX, "").trim().to_string();
    (!title.is_empty()).then_some(title)
}

fn heading(document: &Html) -> Option<String> {
    select_text(document, "h1")
}

fn canonical(document: &Html) -> Option<String> {
    select_attr(document, r#"link[rel="canonical"]"#, "href")
}

fn description(document: &Html) -> Option<String> {
    let caratt = select_first(document, "#caratt")?;
    let text = text_excluding(caratt, ".property-d-table");
    (!text.is_empty()).then_some(text)
}

fn contract_tag(document: &Html) -> Option<Contract> {
    let tag = select_text(document, "span.tag")?;
    Some(Contract::classify(&tag))
}

fn energy_class(document: &Html) -> Option<String> {
    let style = select_attr(document, ".bgimg", "style")?;
    ENERGY_CLASS
        .captures(&style)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn split_features(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Fills the fields held by the characteristics table
fn apply_table(listing: &mut Listing, table: ElementRef<'_>) {
    let value = |label: &str| labeled_value(table, label, &TABLE);
    let number = |label: &str| labeled_number(table, label, &TABLE);

    listing.price = clean_price(value("Prezzo").as_deref());
    listing.year_built = number("Anno di costruzione").and_then(|n| i32::try_from(n).ok());
    listing.floor = value("Piano");
    listing.square_meters = clean_area(value("Metri quadri").as_deref());
    listing.bedrooms = number("Camere").and_then(|n| u32::try_from(n).ok());
    listing.rooms = number("Locali")
        .and_then(|n| u32::try_from(n).ok())
        .or(listing.bedrooms);
    listing.bathrooms = number("Bagni").and_then(|n| u32::try_from(n).ok());
    if let Some(city) = value("Comune") {
        listing.city = city;
    }
    listing.neighborhood = value("Zona");
    listing.address = value("Indirizzo");
    listing.code = value("Riferimento");

    let ambienti = value("Ambienti");
    let comfort = value("Comfort");

    if let Some(ambienti) = &ambienti {
        let lower = ambienti.to_lowercase();
        listing.has_garage = Some(lower.contains("garage"));
        listing.is_furnished = Some(lower.contains("arredato"));
    }

    if let Some(comfort) = &comfort {
        let lower = comfort.to_lowercase();
        listing.has_elevator = Some(lower.contains("ascensore"));
        listing.has_air_conditioning =
            Some(lower.contains("aria condizionata") || lower.contains("condizionatore"));
        if lower.contains("riscaldamento") {
            listing.heating = Some(Heating::classify(&lower));
        }
    }

    let features: Vec<String> = ambienti
        .iter()
        .chain(comfort.iter())
        .flat_map(|text| split_features(text))
        .collect();
    if !features.is_empty() {
        listing.features = Some(features);
    }
}

/// Extractor for Tetto Rosso detail pages
#[derive(Debug, Clone, Copy, Default)]
pub struct TettorossoExtractor;

impl Extractor for TettorossoExtractor {
    fn extract(&self, markup: &str, source: &SourceRef) -> Listing {
        let document = Html::parse_document(markup);

        let url = first_match(&document, &[canonical]).unwrap_or_else(|| source.url.clone());
        let mut listing = Listing::new(AGENCY_ID, &url);
        listing.raw_html_file = source.raw_html_file.clone();

        listing.title = first_match(&document, &[title_tag, heading]).unwrap_or_default();
        listing.description = first_match(&document, &[description]).unwrap_or_default();
        listing.contract = first_match(&document, &[contract_tag])
            .or_else(|| Contract::match_vocabulary(&source.url))
            .or_else(|| Contract::match_vocabulary(&listing.title))
            .unwrap_or(Contract::Sell);
        listing.energy_class = first_match(&document, &[energy_class]);

        if let Some(table) = select_first(&document, "#caratt .property-d-table tbody") {
            apply_table(&mut listing, table);
        }

        listing
    }
}

/// Tetto Rosso website source
pub struct TettorossoSource {
    base_url: Url,
    traversal: SequentialPages,
    extractor: TettorossoExtractor,
}

impl TettorossoSource {
    pub fn new(base_url: &str) -> Result<Self, HomefinderError> {
        let base_url = site_root(base_url)?;
        let index = base_url.join(INDEX_PATH)?;

        let traversal = SequentialPages {
            index_url: Box::new(move |page| index_url(&index, page)),
            anchor_css: "div.property_item a[href]",
            links: LinkFilter::new(DETAIL_PATH.clone(), EXCLUDED_PATHS),
            has_next: has_next_page,
        };

        Ok(Self {
            base_url,
            traversal,
            extractor: TettorossoExtractor,
        })
    }
}

#[async_trait]
impl Source for TettorossoSource {
    fn name(&self) -> &str {
        AGENCY_ID
    }

    fn agency(&self) -> Agency {
        Agency::new(AGENCY_ID, AGENCY_NAME, self.base_url.as_str())
    }

    async fn crawl(&self, ctx: &CrawlContext) -> Result<Vec<Listing>, HomefinderError> {
        let listings = self.traversal.crawl(ctx, &self.extractor).await?;
        tracing::info!("{}: extracted {} listings", AGENCY_ID, listings.len());
        Ok(listings)
    }
}
