use crate::config::types::MirrorConfig;
use crate::ConfigError;
use std::time::Duration;
use url::Url;

const MAX_WORKERS: usize = 64;

/// Validates the entire configuration
pub fn validate(config: &MirrorConfig) -> Result<(), ConfigError> {
    validate_start_url(&config.start_url)?;
    validate_limits(config)?;
    validate_user_agent(config.user_agent.as_deref())?;

    for pattern in &config.cdn_patterns {
        validate_host_pattern(pattern)?;
    }

    Ok(())
}

fn validate_start_url(raw: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid start_url '{}': {}", raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "start_url '{}' must use http or https",
            raw
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::InvalidUrl(format!(
            "start_url '{}' has no host",
            raw
        )));
    }

    Ok(())
}

fn validate_limits(config: &MirrorConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.max_workers < 1 || config.max_workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "max_workers must be between 1 and {}, got {}",
            MAX_WORKERS, config.max_workers
        )));
    }

    if Duration::try_from_secs_f64(config.delay).is_err() {
        return Err(ConfigError::Validation(format!(
            "delay must be a non-negative number of seconds, got {}",
            config.delay
        )));
    }

    if config.timeout <= 0.0 || Duration::try_from_secs_f64(config.timeout).is_err() {
        return Err(ConfigError::Validation(format!(
            "timeout must be a positive number of seconds, got {}",
            config.timeout
        )));
    }

    Ok(())
}

fn validate_user_agent(user_agent: Option<&str>) -> Result<(), ConfigError> {
    match user_agent {
        Some(ua) if ua.trim().is_empty() => Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Validates a CDN host pattern
///
/// Patterns are host fragments (`cdn.`), full hosts (`wixstatic.com`) or
/// wildcard domains (`*.example.com`).
fn validate_host_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Host pattern cannot be empty".to_string(),
        ));
    }

    if !pattern
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '*')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Host pattern '{}' contains invalid characters",
            pattern
        )));
    }

    if let Some(base) = pattern.strip_prefix("*.") {
        if base.is_empty() || base.contains('*') {
            return Err(ConfigError::InvalidPattern(format!(
                "Wildcard pattern '{}' needs a base domain",
                pattern
            )));
        }
    } else if pattern.contains('*') {
        return Err(ConfigError::InvalidPattern(format!(
            "'*' is only allowed as a leading '*.' in '{}'",
            pattern
        )));
    }

    Ok(())
}
