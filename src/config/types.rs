use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for HomeFinder
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    pub storage: StorageConfig,
    #[serde(default, rename = "source")]
    pub sources: Vec<SourceEntry>,
}

/// Outbound request behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    /// Identity string sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Attempts per request before giving up
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Pause between failed attempts (milliseconds)
    #[serde(rename = "retry-backoff-ms", default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Politeness delay after every successful request (milliseconds)
    #[serde(rename = "request-delay-ms", default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Upper bound on index pages visited per source and run
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,
}

impl ScraperConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

/// Background loop timing
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// How long the loop sleeps after a completed run (minutes)
    #[serde(rename = "interval-minutes", default = "default_interval_minutes")]
    pub interval_minutes: u64,

    /// Minimum time between two runs unless forced (minutes)
    #[serde(rename = "min-interval-minutes", default = "default_min_interval_minutes")]
    pub min_interval_minutes: u64,

    /// Granularity of interruptible sleeps (milliseconds)
    #[serde(rename = "poll-increment-ms", default = "default_poll_increment_ms")]
    pub poll_increment_ms: u64,

    /// Sleep when no run is due yet (seconds)
    #[serde(rename = "idle-backoff-secs", default = "default_idle_backoff_secs")]
    pub idle_backoff_secs: u64,

    /// Sleep after a failed loop iteration (seconds)
    #[serde(rename = "error-backoff-secs", default = "default_error_backoff_secs")]
    pub error_backoff_secs: u64,

    /// How long `stop()` waits for the loop to exit (seconds)
    #[serde(rename = "stop-timeout-secs", default = "default_stop_timeout_secs")]
    pub stop_timeout_secs: u64,
}

impl ScheduleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.saturating_mul(60))
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_secs(self.min_interval_minutes.saturating_mul(60))
    }

    pub fn poll_increment(&self) -> Duration {
        Duration::from_millis(self.poll_increment_ms)
    }

    pub fn idle_backoff(&self) -> Duration {
        Duration::from_secs(self.idle_backoff_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
            min_interval_minutes: default_min_interval_minutes(),
            poll_increment_ms: default_poll_increment_ms(),
            idle_backoff_secs: default_idle_backoff_secs(),
            error_backoff_secs: default_error_backoff_secs(),
            stop_timeout_secs: default_stop_timeout_secs(),
        }
    }
}

/// Persistence configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Directory holding raw detail-page markup
    #[serde(rename = "raw-html-dir")]
    pub raw_html_dir: String,

    /// Maximum number of scrape runs kept in history
    #[serde(rename = "history-retention", default = "default_history_retention")]
    pub history_retention: u32,
}

/// Supported source websites
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    Tettorosso,
    Galileo,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tettorosso => "tettorosso",
            Self::Galileo => "galileo",
        }
    }
}

/// One configured source website
#[derive(Debug, Clone, Deserialize)]
pub struct SourceEntry {
    pub kind: SourceKind,

    /// Site root, e.g. "https://www.tettorossoimmobiliare.it"
    #[serde(rename = "base-url")]
    pub base_url: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_request_delay_ms() -> u64 {
    1000
}

fn default_max_pages() -> u32 {
    50
}

fn default_interval_minutes() -> u64 {
    60
}

fn default_min_interval_minutes() -> u64 {
    30
}

fn default_poll_increment_ms() -> u64 {
    1000
}

fn default_idle_backoff_secs() -> u64 {
    30
}

fn default_error_backoff_secs() -> u64 {
    60
}

fn default_stop_timeout_secs() -> u64 {
    60
}

fn default_history_retention() -> u32 {
    500
}

fn default_enabled() -> bool {
    true
}
