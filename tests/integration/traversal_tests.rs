use crate::common::{
    crawl_context, galileo_detail, galileo_fragment, html, tettorosso_detail, tettorosso_index,
};
use homefinder::sources::{GalileoSource, Source, TettorossoSource};
use homefinder::storage::artifact_key;
use homefinder::{Contract, HomefinderError, TraversalError};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_tettorosso_detail(server: &MockServer, slug: &str, title: &str, price: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/immobili/{slug}/")))
        .respond_with(html(tettorosso_detail(title, price)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_sequential_pages_follow_next_marker() {
    let server = MockServer::start().await;
    let raw = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/immobili.php"))
        .and(query_param("start", "0"))
        .respond_with(html(tettorosso_index(&["villa-a", "loft-b", "wishlist"], true)))
        .expect(1)
        .mount(&server)
        .await;
    // loft-b repeats and must not be fetched twice
    Mock::given(method("GET"))
        .and(path("/immobili.php"))
        .and(query_param("start", "12"))
        .respond_with(html(tettorosso_index(&["loft-b", "casa-c"], false)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/immobili.php"))
        .and(query_param("start", "24"))
        .respond_with(html(tettorosso_index(&["never"], false)))
        .expect(0)
        .mount(&server)
        .await;

    mount_tettorosso_detail(&server, "villa-a", "Villa A", "€ 250.000").await;
    mount_tettorosso_detail(&server, "casa-c", "Casa C", "€ 99.500").await;
    Mock::given(method("GET"))
        .and(path("/immobili/loft-b/"))
        .respond_with(html(tettorosso_detail("Loft B", "€ 180.000")))
        .expect(1)
        .mount(&server)
        .await;

    let source = TettorossoSource::new(&server.uri()).unwrap();
    let ctx = crawl_context(raw.path(), 10);
    let listings = source.crawl(&ctx).await.expect("crawl failed");

    let titles: Vec<&str> = listings.iter().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, vec!["Villa A", "Loft B", "Casa C"]);

    let villa = &listings[0];
    assert_eq!(villa.url, format!("{}/immobili/villa-a/", server.uri()));
    assert_eq!(villa.agency, "tettorosso");
    assert_eq!(villa.price, 250_000.0);
    assert_eq!(villa.city, "Bologna");
    assert_eq!(villa.contract, Contract::Sell);

    let key = artifact_key(&villa.url);
    let archived = raw.path().join(format!("{key}.html"));
    assert!(archived.exists(), "raw markup should be archived");
    assert_eq!(
        villa.raw_html_file.as_deref(),
        Some(archived.to_string_lossy().as_ref())
    );
}

#[tokio::test]
async fn test_sequential_pages_stop_on_repeated_page() {
    let server = MockServer::start().await;
    let raw = TempDir::new().unwrap();

    // Every page advertises a next page but keeps listing the same property
    Mock::given(method("GET"))
        .and(path("/immobili.php"))
        .respond_with(html(tettorosso_index(&["sempre-lui"], true)))
        .expect(2)
        .mount(&server)
        .await;
    mount_tettorosso_detail(&server, "sempre-lui", "Sempre lui", "€ 1.000").await;

    let source = TettorossoSource::new(&server.uri()).unwrap();
    let listings = source.crawl(&crawl_context(raw.path(), 50)).await.unwrap();

    assert_eq!(listings.len(), 1);
}

#[tokio::test]
async fn test_sequential_pages_respect_page_cap() {
    let server = MockServer::start().await;
    let raw = TempDir::new().unwrap();

    for (start, slug) in [("0", "uno"), ("12", "due"), ("24", "tre")] {
        Mock::given(method("GET"))
            .and(path("/immobili.php"))
            .and(query_param("start", start))
            .respond_with(html(tettorosso_index(&[slug], true)))
            .mount(&server)
            .await;
        mount_tettorosso_detail(&server, slug, slug, "€ 10.000").await;
    }

    let source = TettorossoSource::new(&server.uri()).unwrap();
    let listings = source.crawl(&crawl_context(raw.path(), 2)).await.unwrap();

    assert_eq!(listings.len(), 2);
}

#[tokio::test]
async fn test_sequential_pages_skip_failed_details() {
    let server = MockServer::start().await;
    let raw = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/immobili.php"))
        .respond_with(html(tettorosso_index(&["ok", "rotto"], false)))
        .mount(&server)
        .await;
    mount_tettorosso_detail(&server, "ok", "Funziona", "€ 75.000").await;
    Mock::given(method("GET"))
        .and(path("/immobili/rotto/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let source = TettorossoSource::new(&server.uri()).unwrap();
    let listings = source.crawl(&crawl_context(raw.path(), 5)).await.unwrap();

    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].title, "Funziona");
}

#[tokio::test]
async fn test_sequential_pages_first_index_unavailable() {
    let server = MockServer::start().await;
    let raw = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/immobili.php"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let source = TettorossoSource::new(&server.uri()).unwrap();
    let result = source.crawl(&crawl_context(raw.path(), 5)).await;

    assert!(matches!(
        result,
        Err(HomefinderError::Traversal(TraversalError::IndexUnavailable { .. }))
    ));
}

#[tokio::test]
async fn test_cancelled_crawl_returns_nothing() {
    let server = MockServer::start().await;
    let raw = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .respond_with(html(tettorosso_index(&["a"], true)))
        .expect(0)
        .mount(&server)
        .await;

    let source = TettorossoSource::new(&server.uri()).unwrap();
    let ctx = crawl_context(raw.path(), 5);
    ctx.cancel.cancel();

    let listings = source.crawl(&ctx).await.unwrap();
    assert!(listings.is_empty());
}

// ===== Paged API =====

const NONCE: &str = "n0nce42";

async fn mount_archive(server: &MockServer, markup: &str) {
    Mock::given(method("GET"))
        .and(path("/immobili/"))
        .respond_with(html(markup))
        .mount(server)
        .await;
}

async fn mount_endpoint_page(server: &MockServer, page: u32, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/wp-admin/admin-ajax.php"))
        .and(body_string_contains("action=load_properties"))
        .and(body_string_contains(format!("nonce={NONCE}")))
        .and(body_string_contains(format!("paged={page}&")))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn mount_galileo_detail(server: &MockServer, slug: &str, title: &str, price: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/immobile/{slug}/")))
        .respond_with(html(galileo_detail(title, price)))
        .mount(server)
        .await;
}

fn envelope(slugs: &[&str], current: u32, max: u32) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "data": {
            "html": galileo_fragment(slugs),
            "current_page": current,
            "max_pages": max,
        }
    }))
}

#[tokio::test]
async fn test_paged_api_walks_all_pages() {
    let server = MockServer::start().await;
    let raw = TempDir::new().unwrap();

    mount_archive(
        &server,
        &format!(r#"<html><body><div id="archive" data-nonce="{NONCE}"></div></body></html>"#),
    )
    .await;
    mount_endpoint_page(&server, 1, envelope(&["villa", "attico"], 1, 2)).await;
    mount_endpoint_page(&server, 2, envelope(&["attico", "rustico"], 2, 2)).await;
    mount_galileo_detail(&server, "villa", "Villa", "€ 320.000").await;
    mount_galileo_detail(&server, "attico", "Attico", "€ 410.000").await;
    mount_galileo_detail(&server, "rustico", "Rustico", "€ 150.000").await;

    let source = GalileoSource::new(&server.uri()).unwrap();
    let listings = source.crawl(&crawl_context(raw.path(), 10)).await.unwrap();

    let titles: Vec<&str> = listings.iter().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, vec!["Villa", "Attico", "Rustico"]);
    assert_eq!(listings[0].agency, "galileo");
    assert_eq!(listings[0].price, 320_000.0);
    assert_eq!(listings[0].square_meters, Some(95));
    assert_eq!(listings[2].url, format!("{}/immobile/rustico/", server.uri()));
}

#[tokio::test]
async fn test_paged_api_reads_nonce_from_script() {
    let server = MockServer::start().await;
    let raw = TempDir::new().unwrap();

    mount_archive(
        &server,
        &format!(
            r#"<html><head><script>var galileo_ajax = {{"ajaxurl":"/wp-admin/admin-ajax.php","nonce":"{NONCE}"}};</script></head><body></body></html>"#
        ),
    )
    .await;
    mount_endpoint_page(&server, 1, envelope(&["villa"], 1, 1)).await;
    mount_galileo_detail(&server, "villa", "Villa", "€ 320.000").await;

    let source = GalileoSource::new(&server.uri()).unwrap();
    let listings = source.crawl(&crawl_context(raw.path(), 10)).await.unwrap();

    assert_eq!(listings.len(), 1);
}

#[tokio::test]
async fn test_paged_api_missing_nonce() {
    let server = MockServer::start().await;
    let raw = TempDir::new().unwrap();

    mount_archive(&server, "<html><body>Archivio immobili</body></html>").await;
    Mock::given(method("POST"))
        .respond_with(envelope(&["villa"], 1, 1))
        .expect(0)
        .mount(&server)
        .await;

    let source = GalileoSource::new(&server.uri()).unwrap();
    let result = source.crawl(&crawl_context(raw.path(), 10)).await;

    assert!(matches!(
        result,
        Err(HomefinderError::Traversal(TraversalError::MissingToken { .. }))
    ));
}

#[tokio::test]
async fn test_paged_api_first_page_refused() {
    let server = MockServer::start().await;
    let raw = TempDir::new().unwrap();

    mount_archive(
        &server,
        &format!(r#"<div data-nonce="{NONCE}"></div>"#),
    )
    .await;
    mount_endpoint_page(
        &server,
        1,
        ResponseTemplate::new(200).set_body_json(json!({"success": false, "data": "bad nonce"})),
    )
    .await;

    let source = GalileoSource::new(&server.uri()).unwrap();
    let result = source.crawl(&crawl_context(raw.path(), 10)).await;

    assert!(matches!(
        result,
        Err(HomefinderError::Traversal(TraversalError::Protocol(_)))
    ));
}

#[tokio::test]
async fn test_paged_api_later_failure_keeps_collected() {
    let server = MockServer::start().await;
    let raw = TempDir::new().unwrap();

    mount_archive(
        &server,
        &format!(r#"<div data-nonce="{NONCE}"></div>"#),
    )
    .await;
    mount_endpoint_page(&server, 1, envelope(&["villa"], 1, 3)).await;
    mount_endpoint_page(&server, 2, ResponseTemplate::new(500)).await;
    mount_endpoint_page(&server, 3, envelope(&["mai"], 3, 3)).await;
    mount_galileo_detail(&server, "villa", "Villa", "€ 320.000").await;

    let source = GalileoSource::new(&server.uri()).unwrap();
    let listings = source.crawl(&crawl_context(raw.path(), 10)).await.unwrap();

    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].title, "Villa");
}
