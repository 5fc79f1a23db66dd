use crate::api::Routing;
use crate::config::types::{ApiConfig, Config, CrawlerConfig, RateLimitConfig, MAX_QUOTA};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_rate_limit_config(&config.rate_limit)?;
    validate_api_config(&config.api)?;

    if config.output.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_player_name(&config.start_player)?;

    // Unknown platforms are rejected here rather than at first request
    Routing::for_platform(&config.platform)?;

    // One slot is taken by the dispatcher, so at least one worker needs two
    if config.concurrency < 2 || config.concurrency > 64 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 2 and 64, got {}",
            config.concurrency
        )));
    }

    if config.min_matches > MAX_QUOTA {
        return Err(ConfigError::Validation(format!(
            "min_matches exceeds allowed limit ({}), got {}",
            MAX_QUOTA, config.min_matches
        )));
    }

    if config.min_players > MAX_QUOTA {
        return Err(ConfigError::Validation(format!(
            "min_players exceeds allowed limit ({}), got {}",
            MAX_QUOTA, config.min_players
        )));
    }

    if config.max_attempts < 1 || config.max_attempts > 100 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be between 1 and 100, got {}",
            config.max_attempts
        )));
    }

    if config.idle_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "idle_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.page_size < 1 || config.page_size > 100 {
        return Err(ConfigError::Validation(format!(
            "page_size must be between 1 and 100, got {}",
            config.page_size
        )));
    }

    Ok(())
}

/// Validates the shared request budget
fn validate_rate_limit_config(config: &RateLimitConfig) -> Result<(), ConfigError> {
    if config.requests < 1 {
        return Err(ConfigError::Validation(
            "rate-limit requests must be >= 1".to_string(),
        ));
    }

    if config.per_seconds < 1 {
        return Err(ConfigError::Validation(
            "rate-limit per_seconds must be >= 1".to_string(),
        ));
    }

    if config.burst < 1 || config.burst > config.requests {
        return Err(ConfigError::Validation(format!(
            "rate-limit burst must be between 1 and {}, got {}",
            config.requests, config.burst
        )));
    }

    Ok(())
}

fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    if config.key_env.is_empty() {
        return Err(ConfigError::Validation(
            "key_env cannot be empty".to_string(),
        ));
    }

    if let Some(base) = &config.base_url {
        let parsed = Url::parse(base)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl(format!(
                "base_url must be http or https, got '{}'",
                base
            )));
        }
    }

    Ok(())
}

/// Summoner names: non-empty, no path separators or query characters
fn validate_player_name(name: &str) -> Result<(), ConfigError> {
    if name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "start_player cannot be empty".to_string(),
        ));
    }

    if name.chars().any(|c| matches!(c, '/' | '?' | '#' | '%')) {
        return Err(ConfigError::Validation(format!(
            "start_player contains invalid characters: '{}'",
            name
        )));
    }

    Ok(())
}
