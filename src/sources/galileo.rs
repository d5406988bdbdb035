//! Galileo Immobiliare
//!
//! The listing archive is rendered client-side from a WordPress
//! `admin-ajax.php` action. The public archive page embeds a nonce that must
//! accompany every request; each response wraps an HTML fragment of listing
//! cards in a JSON envelope. Detail pages live under `/immobile/<slug>/`.

use crate::crawler::{CrawlContext, PagedApi};
use crate::extract::{
    clean_area, clean_price, first_match, labeled_number, labeled_value, meta_content,
    parse_decimal, parse_yes_no, select_all_text, select_attr, select_first, select_text,
    Rule, TableLayout,
};
use crate::model::{Agency, Contract, Heating, Listing};
use crate::sources::{Extractor, Source, SourceRef};
use crate::url::{site_root, LinkFilter};
use crate::HomefinderError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use url::Url;

const AGENCY_ID: &str = "galileo";
const AGENCY_NAME: &str = "Galileo Immobiliare";

const ARCHIVE_PATH: &str = "immobili/";
const ENDPOINT_PATH: &str = "wp-admin/admin-ajax.php";
const ACTION: &str = "load_properties";

const EXCLUDED_PATHS: &[&str] = &["contatti", "privacy", "cookie", "lavora-con-noi", "wishlist"];

/// `<li><span class="label">Label</span><span class="value">Value</span></li>`
const DETAILS: TableLayout = TableLayout {
    hops: 2,
    children: 2,
    value_index: 1,
    count_blank_text: false,
};

static DETAIL_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/immobile/[^/?#]+/?$").expect("static detail pattern is valid"));

static SCRIPT_NONCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""nonce"\s*:\s*"([A-Za-z0-9]+)""#).expect("static nonce pattern is valid")
});

static ENERGY_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-G][1-5]?\+{0,4})(?:\s|$)").expect("static energy pattern is valid"));

// ===== Nonce rules =====

fn data_nonce(document: &Html) -> Option<String> {
    select_attr(document, "[data-nonce]", "data-nonce")
}

fn script_nonce(document: &Html) -> Option<String> {
    select_all_text(document, "script")
        .iter()
        .find_map(|script| SCRIPT_NONCE.captures(script))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

const NONCE_RULES: &[Rule<String>] = &[data_nonce, script_nonce];

// ===== Field rules =====

/// Value of a row of the `ul.property-details` list
fn detail(document: &Html, label: &str) -> Option<String> {
    let list = select_first(document, "ul.property-details")?;
    labeled_value(list, label, &DETAILS)
}

fn detail_number(document: &Html, label: &str) -> Option<u32> {
    let list = select_first(document, "ul.property-details")?;
    labeled_number(list, label, &DETAILS).and_then(|n| u32::try_from(n).ok())
}

fn detail_flag(document: &Html, label: &str) -> Option<bool> {
    detail(document, label).as_deref().and_then(parse_yes_no)
}

fn property_title(document: &Html) -> Option<String> {
    select_text(document, "h1.property-title")
}

fn og_title(document: &Html) -> Option<String> {
    meta_content(document, "og:title")
}

fn title_tag(document: &Html) -> Option<String> {
    select_text(document, "title")
}

fn canonical(document: &Html) -> Option<String> {
    select_attr(document, r#"link[rel="canonical"]"#, "href")
}

fn property_description(document: &Html) -> Option<String> {
    select_text(document, ".property-description")
}

fn og_description(document: &Html) -> Option<String> {
    meta_content(document, "og:description")
}

fn status_badge(document: &Html) -> Option<Contract> {
    select_text(document, ".property-status").and_then(|s| Contract::match_vocabulary(&s))
}

fn price_badge(document: &Html) -> Option<String> {
    select_text(document, ".property-price")
}

fn price_detail(document: &Html) -> Option<String> {
    detail(document, "Prezzo")
}

fn city_badge(document: &Html) -> Option<String> {
    select_text(document, ".property-city")
}

fn city_detail(document: &Html) -> Option<String> {
    detail(document, "Comune")
}

fn zone_badge(document: &Html) -> Option<String> {
    select_text(document, ".property-zone")
}

fn zone_detail(document: &Html) -> Option<String> {
    detail(document, "Zona")
}

fn published_time(document: &Html) -> Option<DateTime<Utc>> {
    let raw = meta_content(document, "article:published_time")?;
    DateTime::parse_from_rfc3339(&raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

fn energy_class(document: &Html) -> Option<String> {
    let raw = detail(document, "Classe energetica")?.to_uppercase();
    ENERGY_CLASS
        .captures(&raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Extractor for Galileo detail pages
#[derive(Debug, Clone, Copy, Default)]
pub struct GalileoExtractor;

impl Extractor for GalileoExtractor {
    fn extract(&self, markup: &str, source: &SourceRef) -> Listing {
        let document = Html::parse_document(markup);

        let url = first_match(&document, &[canonical]).unwrap_or_else(|| source.url.clone());
        let mut listing = Listing::new(AGENCY_ID, &url);
        listing.raw_html_file = source.raw_html_file.clone();

        listing.title =
            first_match(&document, &[property_title, og_title, title_tag]).unwrap_or_default();
        listing.description =
            first_match(&document, &[property_description, og_description]).unwrap_or_default();
        listing.contract = first_match(&document, &[status_badge])
            .or_else(|| Contract::match_vocabulary(&source.url))
            .unwrap_or(Contract::Sell);
        listing.price = clean_price(first_match(&document, &[price_badge, price_detail]).as_deref());

        listing.city = first_match(&document, &[city_badge, city_detail]).unwrap_or_default();
        listing.neighborhood = first_match(&document, &[zone_badge, zone_detail]);
        listing.address = select_text(&document, ".property-address");

        listing.square_meters = clean_area(detail(&document, "Superficie").as_deref());
        listing.rooms = detail_number(&document, "Locali");
        listing.bedrooms = detail_number(&document, "Camere");
        listing.bathrooms = detail_number(&document, "Bagni");
        listing.floor = detail(&document, "Piano");
        listing.year_built = detail_number(&document, "Anno").and_then(|y| i32::try_from(y).ok());

        listing.heating = detail(&document, "Riscaldamento").map(|h| Heating::classify(&h));
        listing.has_elevator = detail_flag(&document, "Ascensore");
        listing.has_garage = detail_flag(&document, "Garage");
        listing.is_furnished = detail_flag(&document, "Arredato");
        listing.has_air_conditioning = detail_flag(&document, "Climatizzazione");

        listing.energy_class = energy_class(&document);
        listing.energy_consumption = detail(&document, "Consumo").as_deref().and_then(parse_decimal);
        listing.code = detail(&document, "Riferimento");

        let features = select_all_text(&document, "ul.property-features li");
        listing.features = (!features.is_empty()).then_some(features);
        listing.publication_date = published_time(&document);

        listing
    }
}

/// Galileo website source
pub struct GalileoSource {
    base_url: Url,
    traversal: PagedApi,
    extractor: GalileoExtractor,
}

impl GalileoSource {
    pub fn new(base_url: &str) -> Result<Self, HomefinderError> {
        let base_url = site_root(base_url)?;

        let traversal = PagedApi {
            index_url: base_url.join(ARCHIVE_PATH)?.to_string(),
            endpoint: base_url.join(ENDPOINT_PATH)?.to_string(),
            action: ACTION,
            filters: vec![
                ("contract".to_string(), "all".to_string()),
                ("orderby".to_string(), "date".to_string()),
            ],
            anchor_css: "a[href]",
            links: LinkFilter::new(DETAIL_PATH.clone(), EXCLUDED_PATHS),
            nonce_rules: NONCE_RULES,
        };

        Ok(Self {
            base_url,
            traversal,
            extractor: GalileoExtractor,
        })
    }
}

#[async_trait]
impl Source for GalileoSource {
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
