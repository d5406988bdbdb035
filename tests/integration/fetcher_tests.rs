use crate::common::{crawl_context, html, tettorosso_detail};
use homefinder::crawler::{process_detail, FetchResult, Fetcher};
use homefinder::sources::TettorossoExtractor;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher(max_retries: u32, backoff: Duration, delay: Duration) -> Fetcher {
    Fetcher::with_client(reqwest::Client::new(), max_retries, backoff, delay)
}

#[tokio::test]
async fn test_retries_until_success() {
    let server = MockServer::start().await;

    // Mounted first: answers the first two attempts, then falls through
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(html("<html>ok</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fetcher(3, Duration::from_millis(10), Duration::ZERO);
    let result = fetcher
        .fetch(&format!("{}/flaky", server.uri()), &CancellationToken::new())
        .await;

    match result {
        FetchResult::Success {
            status_code, body, ..
        } => {
            assert_eq!(status_code, 200);
            assert_eq!(body, "<html>ok</html>");
        }
        other => panic!("expected success, got {:?}", other),
    }
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_gives_up_after_max_retries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let fetcher = fetcher(3, Duration::ZERO, Duration::ZERO);
    let result = fetcher
        .fetch(&format!("{}/down", server.uri()), &CancellationToken::new())
        .await;

    assert!(matches!(result, FetchResult::HttpError { status_code: 503 }));
}

#[tokio::test]
async fn test_post_form_retries() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/endpoint"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/endpoint"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&server)
        .await;

    let form = vec![("paged".to_string(), "1".to_string())];
    let result = fetcher(2, Duration::ZERO, Duration::ZERO)
        .post_form(&format!("{}/endpoint", server.uri()), &form, &CancellationToken::new())
        .await;

    assert_eq!(result.into_body().as_deref(), Some("{}"));
}

#[tokio::test]
async fn test_politeness_delay_follows_success_only() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(html("ok"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let delay = Duration::from_millis(400);
    let fetcher = fetcher(3, Duration::ZERO, delay);
    let cancel = CancellationToken::new();

    let started = Instant::now();
    assert!(fetcher
        .fetch(&format!("{}/ok", server.uri()), &cancel)
        .await
        .is_success());
    assert!(started.elapsed() >= delay);

    let started = Instant::now();
    assert!(!fetcher
        .fetch(&format!("{}/broken", server.uri()), &cancel)
        .await
        .is_success());
    assert!(
        started.elapsed() < delay,
        "failed attempts took {:?}",
        started.elapsed()
    );

    let started = Instant::now();
    let override_delay = Duration::from_millis(50);
    assert!(fetcher
        .fetch_with_delay(&format!("{}/ok", server.uri()), override_delay, &cancel)
        .await
        .is_success());
    assert!(started.elapsed() >= override_delay);
    assert!(started.elapsed() < delay);
}

#[tokio::test]
async fn test_stop_interrupts_retry_backoff() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fetcher(5, Duration::from_secs(30), Duration::ZERO);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let result = fetcher
        .fetch(&format!("{}/down", server.uri()), &cancel)
        .await;

    assert!(matches!(result, FetchResult::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_stop_lets_request_in_flight_finish() {
    let server = MockServer::start().await;
    let raw = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/immobili/lento/"))
        .respond_with(
            html(tettorosso_detail("Lento", "€ 90.000")).set_delay(Duration::from_millis(500)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let ctx = crawl_context(raw.path(), 1);
    let trigger = ctx.cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let url = format!("{}/immobili/lento/", server.uri());
    let listing = process_detail(&ctx, &url, &TettorossoExtractor)
        .await
        .expect("listing fetched before the stop is kept");

    assert!(ctx.is_cancelled());
    assert_eq!(listing.title, "Lento");
    assert_eq!(listing.price, 90_000.0);
    assert!(listing.raw_html_file.is_some());
}
