use homefinder::config::ScheduleConfig;
use homefinder::crawler::{CrawlContext, Fetcher};
use homefinder::storage::FsArtifactStore;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::ResponseTemplate;

/// Single attempt, no backoff, no politeness delay
pub fn test_fetcher() -> Fetcher {
    Fetcher::with_client(reqwest::Client::new(), 1, Duration::ZERO, Duration::ZERO)
}

pub fn crawl_context(raw_dir: &Path, max_pages: u32) -> CrawlContext {
    CrawlContext {
        fetcher: test_fetcher(),
        artifacts: Arc::new(FsArtifactStore::new(raw_dir)),
        cancel: CancellationToken::new(),
        max_pages,
    }
}

pub fn fast_schedule() -> ScheduleConfig {
    ScheduleConfig {
        poll_increment_ms: 10,
        stop_timeout_secs: 5,
        ..Default::default()
    }
}

pub fn html(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body.into())
}

/// Tetto Rosso index page linking to `slugs`
pub fn tettorosso_index(slugs: &[&str], next: bool) -> String {
    let items: String = slugs
        .iter()
        .map(|slug| {
            format!(
                r#"<div class="property_item"><a href="/immobili/{slug}/"><img src="/img/{slug}.jpg"></a></div>"#
            )
        })
        .collect();
    let pagination = if next {
        r#"<a href="immobili.php?azione=list&start=0"><i class="fa fa-chevron-left"></i></a>
           <a href="immobili.php?azione=list&start=99"><i class="fa fa-chevron-right"></i></a>"#
    } else {
        r#"<a href="immobili.php?azione=list&start=0"><i class="fa fa-chevron-left"></i></a>"#
    };
    format!(
        r#"<html><body>
             <nav><a href="/contatti/">Contatti</a></nav>
             <div class="properties">{items}</div>
             <ul class="pagination">{pagination}</ul>
           </body></html>"#
    )
}

/// Tetto Rosso detail page with a price row
pub fn tettorosso_detail(title: &str, price: &str) -> String {
    format!(
        r#"<html>
<head><title>{title} | Tetto Rosso Immobiliare</title></head>
<body>
  <span class="tag">VENDITA</span>
  <div id="caratt">
    <p>Descrizione di {title}.</p>
    <div class="property-d-table">
      <table>
        <tbody>
          <tr>
            <td><span>Prezzo</span></td>
            <td>{price}</td>
          </tr>
          <tr>
            <td><span>Comune</span></td>
            <td>Bologna</td>
          </tr>
        </tbody>
      </table>
    </div>
  </div>
</body>
</html>"#
    )
}

/// Galileo detail page
pub fn galileo_detail(title: &str, price: &str) -> String {
    format!(
        r#"<html><head><title>{title} - Galileo</title></head><body>
             <h1 class="property-title">{title}</h1>
             <span class="property-status">Vendita</span>
             <span class="property-price">{price}</span>
             <ul class="property-details">
               <li><span class="label">Superficie</span><span class="value">95 m²</span></li>
             </ul>
           </body></html>"#
    )
}

/// Listing-card fragment as returned inside the endpoint envelope
pub fn galileo_fragment(slugs: &[&str]) -> String {
    slugs
        .iter()
        .map(|slug| {
            format!(r#"<article class="card"><a href="/immobile/{slug}/">{slug}</a></article>"#)
        })
        .collect()
}
