//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the scraper, including:
//! - Building HTTP clients with the configured user agent and timeout
//! - GET requests for index and detail pages
//! - Form POSTs to listing-data endpoints
//! - Bounded retry with a fixed backoff
//! - The politeness delay after every successful request
//! - Cooperative cancellation between attempts

use crate::config::ScraperConfig;
use crate::HomefinderError;
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Response body
        body: String,
    },

    /// The server answered with a non-2xx status on the last attempt
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Network error (connection refused, timeout, etc.)
    NetworkError {
        /// Error description
        error: String,
    },

    /// A stop was requested before the request could complete
    Cancelled,
}

impl FetchResult {
    /// The response body, or `None` for any kind of failure
    pub fn into_body(self) -> Option<String> {
        match self {
            Self::Success { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The scraper configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &ScraperConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(config.request_timeout())
        .connect_timeout(Duration::from_secs(10).min(config.request_timeout()))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Polite HTTP fetcher shared by every traversal of a run
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    max_retries: u32,
    retry_backoff: Duration,
    request_delay: Duration,
}

impl Fetcher {
    /// Creates a fetcher from the scraper configuration
    pub fn new(config: &ScraperConfig) -> Result<Self, HomefinderError> {
        let client = build_http_client(config)?;
        Ok(Self::with_client(
            client,
            config.max_retries,
            config.retry_backoff(),
            config.request_delay(),
        ))
    }

    /// Creates a fetcher around an existing client
    pub fn with_client(
        client: Client,
        max_retries: u32,
        retry_backoff: Duration,
        request_delay: Duration,
    ) -> Self {
        Self {
            client,
            max_retries: max_retries.max(1),
            retry_backoff,
            request_delay,
        }
    }

    /// GETs `url`, sleeping the configured politeness delay on success
    pub async fn fetch(&self, url: &str, cancel: &CancellationToken) -> FetchResult {
        self.fetch_with_delay(url, self.request_delay, cancel).await
    }

    /// GETs `url` with a per-call politeness delay
    pub async fn fetch_with_delay(
        &self,
        url: &str,
        delay: Duration,
        cancel: &CancellationToken,
    ) -> FetchResult {
        self.execute(url, delay, cancel, || self.client.get(url)).await
    }

    /// POSTs url-encoded `form` fields to `url`
    pub async fn post_form(
        &self,
        url: &str,
        form: &[(String, String)],
        cancel: &CancellationToken,
    ) -> FetchResult {
        self.execute(url, self.request_delay, cancel, || {
            self.client.post(url).form(form)
        })
        .await
    }

    /// Runs the retry loop around a request factory
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | 2xx | Return body after the politeness delay |
    /// | non-2xx | Retry up to `max_retries` attempts |
    /// | Timeout / connection error | Retry up to `max_retries` attempts |
    /// | Stop requested | Finish the request in flight, then return `Cancelled` instead of retrying |
    async fn execute<F>(
        &self,
        url: &str,
        delay: Duration,
        cancel: &CancellationToken,
        request: F,
    ) -> FetchResult
    where
        F: Fn() -> RequestBuilder,
    {
        let mut last = FetchResult::NetworkError {
            error: "no attempt made".to_string(),
        };

        for attempt in 1..=self.max_retries {
            if cancel.is_cancelled() {
                return FetchResult::Cancelled;
            }

            // A request already sent runs to completion, bounded by the
            // client timeout
            last = send_once(request()).await;

            if last.is_success() {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => {}
                }
                return last;
            }

            match &last {
                FetchResult::HttpError { status_code } => {
                    tracing::debug!(
                        "Attempt {}/{} for {} returned HTTP {}",
                        attempt,
                        self.max_retries,
                        url,
                        status_code
                    );
                }
                FetchResult::NetworkError { error } => {
                    tracing::debug!(
                        "Attempt {}/{} for {} failed: {}",
                        attempt,
                        self.max_retries,
                        url,
                        error
                    );
                }
                _ => {}
            }

            if attempt < self.max_retries {
                tokio::select! {
                    _ = tokio::time::sleep(self.retry_backoff) => {}
                    _ = cancel.cancelled() => return FetchResult::Cancelled,
                }
            }
        }

        tracing::warn!(
            "Giving up on {} after {} attempts: {:?}",
            url,
            self.max_retries,
            last
        );
        last
    }
}

/// Sends one request and classifies the outcome
async fn send_once(request: RequestBuilder) -> FetchResult {
    match request.send().await {
        Ok(response) => {
            let status = response.status();
            let final_url = response.url().to_string();

            if !status.is_success() {
                return FetchResult::HttpError {
                    status_code: status.as_u16(),
                };
            }

            match response.text().await {
                Ok(body) => FetchResult::Success {
                    final_url,
                    status_code: status.as_u16(),
                    body,
                },
                Err(e) => FetchResult::NetworkError {
                    error: e.to_string(),
                },
            }
        }
        Err(e) => {
            let error = if e.is_timeout() {
                "Request timeout".to_string()
            } else if e.is_connect() {
                format!("Connection failed: {}", e)
            } else {
                e.to_string()
            };
            FetchResult::NetworkError { error }
        }
    }
}
