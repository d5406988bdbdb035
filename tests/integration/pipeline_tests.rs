use crate::common::{html, tettorosso_detail, tettorosso_index};
use homefinder::config::parse_config;
use homefinder::crawler::build_scraper;
use homefinder::storage::{SqliteStorage, Storage};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer};

fn config_toml(base_url: &str, dir: &Path) -> String {
    format!(
        r#"
[scraper]
user-agent = "HomeFinderTest/1.0"
request-timeout-secs = 5
max-retries = 1
retry-backoff-ms = 0
request-delay-ms = 0
max-pages = 3

[schedule]
interval-minutes = 60
min-interval-minutes = 30
poll-increment-ms = 10

[storage]
database-path = "{db}"
raw-html-dir = "{raw}"
history-retention = 5

[[source]]
kind = "tettorosso"
base-url = "{base_url}"

[[source]]
kind = "galileo"
base-url = "https://www.galileoimmobiliare.it"
enabled = false
"#,
        db = dir.join("homefinder.db").display(),
        raw = dir.join("raw").display(),
    )
}

#[tokio::test]
async fn test_scrape_run_from_config() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/immobili.php"))
        .respond_with(html(tettorosso_index(&["bilocale", "trilocale"], false)))
        .mount(&server)
        .await;
    for (slug, title) in [("bilocale", "Bilocale"), ("trilocale", "Trilocale")] {
        Mock::given(method("GET"))
            .and(path(format!("/immobili/{slug}/")))
            .respond_with(html(tettorosso_detail(title, "€ 120.000")))
            .mount(&server)
            .await;
    }

    let config = parse_config(&config_toml(&server.uri(), dir.path())).expect("config is valid");
    let scraper = build_scraper(&config).expect("scraper builds");
    assert_eq!(scraper.source_names(), "tettorosso");

    assert!(scraper.should_run(false));
    assert_eq!(scraper.run_once(false).await, 2);

    // Inside the minimum interval only a forced run goes ahead
    assert!(!scraper.should_run(false));
    assert_eq!(scraper.run_once(false).await, 0);
    assert_eq!(scraper.run_once(true).await, 2);
    drop(scraper);

    let storage = SqliteStorage::new(&dir.path().join("homefinder.db"), 5).unwrap();
    assert_eq!(storage.count_listings().unwrap(), 2);

    let url = format!("{}/immobili/bilocale/", server.uri());
    let listing = storage.get_listing_by_url(&url).unwrap().expect("listing stored");
    assert_eq!(listing.title, "Bilocale");
    assert_eq!(listing.price, 120_000.0);
    let raw_file = listing.raw_html_file.expect("markup archived");
    assert!(Path::new(&raw_file).starts_with(dir.path().join("raw")));
    assert!(Path::new(&raw_file).exists());

    let agencies = storage.get_agencies().unwrap();
    assert_eq!(agencies.len(), 1);
    assert_eq!(agencies[0].id, "tettorosso");

    let runs = storage.recent_runs(10).unwrap();
    assert_eq!(runs.len(), 2);
    assert!(runs.iter().all(|r| r.listings == 2 && r.source == "tettorosso"));
}
