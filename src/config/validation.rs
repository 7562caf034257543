use crate::config::types::{
    Config, HttpConfig, KnownMapping, OutputConfig, ResolverConfig, SourcesConfig,
};
use crate::ConfigError;
use url::Url;

/// Upper bound on browser sessions; each one is a full Chrome process
const MAX_POOL_SIZE: u32 = 16;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_resolver_config(&config.resolver)?;
    validate_http_config(&config.http)?;
    validate_sources_config(&config.sources)?;
    validate_output_config(&config.output)?;
    validate_known_mappings(&config.known_mappings)?;

    if config.browser.page_load_timeout_seconds < 1 {
        return Err(ConfigError::Validation(
            "page_load_timeout_seconds must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates resolver configuration
fn validate_resolver_config(config: &ResolverConfig) -> Result<(), ConfigError> {
    if config.pool_size < 1 || config.pool_size > MAX_POOL_SIZE {
        return Err(ConfigError::Validation(format!(
            "pool_size must be between 1 and {}, got {}",
            MAX_POOL_SIZE, config.pool_size
        )));
    }

    if !config.base_delay_seconds.is_finite() || config.base_delay_seconds < 0.5 {
        return Err(ConfigError::Validation(format!(
            "base_delay_seconds must be >= 0.5, got {}",
            config.base_delay_seconds
        )));
    }

    if config.acquire_timeout_seconds < 1 {
        return Err(ConfigError::Validation(format!(
            "acquire_timeout_seconds must be >= 1, got {}",
            config.acquire_timeout_seconds
        )));
    }

    if config.per_item_limit == Some(0) {
        return Err(ConfigError::Validation(
            "per_item_limit must be >= 1 when set".to_string(),
        ));
    }

    if config.workers < 1 || config.workers > config.pool_size {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and pool_size ({}), got {}",
            config.pool_size, config.workers
        )));
    }

    if config.strategy_timeout_seconds < 1 {
        return Err(ConfigError::Validation(format!(
            "strategy_timeout_seconds must be >= 1, got {}",
            config.strategy_timeout_seconds
        )));
    }

    Ok(())
}

/// Validates HTTP configuration
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.request_timeout_seconds < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_seconds must be >= 1, got {}",
            config.request_timeout_seconds
        )));
    }

    if config.user_agents.is_empty() {
        return Err(ConfigError::Validation(
            "user_agents must contain at least one entry".to_string(),
        ));
    }

    if config.user_agents.iter().any(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "user_agents cannot contain empty strings".to_string(),
        ));
    }

    Ok(())
}

/// Validates catalog base URLs
fn validate_sources_config(config: &SourcesConfig) -> Result<(), ConfigError> {
    validate_base_url("primary_base_url", &config.primary_base_url)?;
    validate_base_url("secondary_base_url", &config.secondary_base_url)?;
    validate_base_url("search_base_url", &config.search_base_url)?;
    Ok(())
}

fn validate_base_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' has no host",
            field, value
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_known_mappings(mappings: &[KnownMapping]) -> Result<(), ConfigError> {
    for mapping in mappings {
        if mapping.identifier.trim().is_empty() || mapping.path.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "known-mapping entries need both identifier and path, got '{}' -> '{}'",
                mapping.identifier, mapping.path
            )));
        }
    }
    Ok(())
}
