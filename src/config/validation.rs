use crate::config::types::{Config, ScheduleConfig, ScraperConfig, SourceEntry, StorageConfig};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_scraper_config(&config.scraper)?;
    validate_schedule_config(&config.schedule)?;
    validate_storage_config(&config.storage)?;
    validate_sources(&config.sources)?;
    Ok(())
}

/// Validates outbound request settings
fn validate_scraper_config(config: &ScraperConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    if config.max_retries < 1 || config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be between 1 and 10, got {}",
            config.max_retries
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    Ok(())
}

/// Upper bound on schedule intervals
const MAX_SCHEDULE_MINUTES: u64 = 365 * 24 * 60;

/// Validates background loop timing
fn validate_schedule_config(config: &ScheduleConfig) -> Result<(), ConfigError> {
    if config.interval_minutes < 1 {
        return Err(ConfigError::Validation(format!(
            "interval_minutes must be >= 1, got {}",
            config.interval_minutes
        )));
    }

    for (name, minutes) in [
        ("interval_minutes", config.interval_minutes),
        ("min_interval_minutes", config.min_interval_minutes),
    ] {
        if minutes > MAX_SCHEDULE_MINUTES {
            return Err(ConfigError::Validation(format!(
                "{} must be <= {} (one year), got {}",
                name, MAX_SCHEDULE_MINUTES, minutes
            )));
        }
    }

    if config.poll_increment_ms < 10 {
        return Err(ConfigError::Validation(format!(
            "poll_increment_ms must be >= 10ms, got {}ms",
            config.poll_increment_ms
        )));
    }

    Ok(())
}

/// Validates persistence settings
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.raw_html_dir.is_empty() {
        return Err(ConfigError::Validation(
            "raw_html_dir cannot be empty".to_string(),
        ));
    }

    if config.history_retention < 1 {
        return Err(ConfigError::Validation(format!(
            "history_retention must be >= 1, got {}",
            config.history_retention
        )));
    }

    Ok(())
}

/// Validates source entries
fn validate_sources(sources: &[SourceEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for entry in sources {
        if !seen.insert(entry.kind) {
            return Err(ConfigError::Validation(format!(
                "Source '{}' is configured more than once",
                entry.kind.as_str()
            )));
        }

        let url = Url::parse(&entry.base_url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid base URL '{}': {}", entry.base_url, e))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(format!(
                "Base URL '{}' must use HTTP or HTTPS",
                entry.base_url
            )));
        }
    }

    if !sources.iter().any(|s| s.enabled) {
        return Err(ConfigError::Validation(
            "At least one source must be enabled".to_string(),
        ));
    }

    Ok(())
}
