use crate::config::types::{
    Config, OutputConfig, ProfileConfig, RetryConfig, SessionConfig, UserAgentConfig,
};
use crate::harvest::{parse_target_year, YearMatch};
use crate::protocol::DateRange;
use crate::{ConfigError, ConfigResult};
use regex::Regex;
use url::Url;

/// Longest retry wait accepted in configuration (ten minutes)
const MAX_WAIT_MS: u64 = 600_000;

/// Largest retry count accepted in configuration
const MAX_RETRIES: u32 = 100;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_session_config(&config.session)?;
    validate_profile_config(&config.profile)?;
    validate_retry_config(&config.retry)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the harvest session selection
fn validate_session_config(config: &SessionConfig) -> ConfigResult<()> {
    validate_http_url("base-url", &config.base_url)?;

    if let Some(endpoint) = &config.oai_request_url {
        validate_http_url("oai-request-url", endpoint)?;
    }

    if config.metadata_prefix.is_empty()
        || config.metadata_prefix.chars().any(char::is_whitespace)
    {
        return Err(ConfigError::Validation(format!(
            "metadata-prefix must be a non-empty token, got '{}'",
            config.metadata_prefix
        )));
    }

    if let Some(set_spec) = &config.set_spec {
        if set_spec.is_empty() {
            return Err(ConfigError::Validation(
                "set-spec cannot be empty when present".to_string(),
            ));
        }
    }

    if let Some(year) = &config.year {
        if config.from.is_some() || config.until.is_some() {
            return Err(ConfigError::Validation(
                "year cannot be combined with from/until".to_string(),
            ));
        }
        parse_target_year(year)?;
    }

    DateRange::parse(config.from.as_deref(), config.until.as_deref())?;

    for url in &config.permission_urls {
        validate_http_url("permission-urls", url)?;
    }

    Ok(())
}

/// Validates profile overrides
fn validate_profile_config(config: &ProfileConfig) -> ConfigResult<()> {
    for (name, pattern) in [
        ("fixed-download-pattern", &config.fixed_download_pattern),
        ("generator-pattern", &config.generator_pattern),
        ("crawl-rule", &config.crawl_rule),
    ] {
        if let Some(pattern) = pattern {
            compile_pattern(name, pattern)?;
        }
    }

    // A redirect pair only makes sense with both ends present
    if config.fixed_download_pattern.is_some() != config.generator_pattern.is_some() {
        return Err(ConfigError::Validation(
            "fixed-download-pattern and generator-pattern must be given together".to_string(),
        ));
    }

    for (name, tag) in [
        ("date-tag", &config.date_tag),
        ("identifier-tag", &config.identifier_tag),
    ] {
        if let Some(tag) = tag {
            if tag.trim().is_empty() || tag.split('/').any(str::is_empty) {
                return Err(ConfigError::Validation(format!(
                    "{} must be a non-empty tag path, got '{}'",
                    name, tag
                )));
            }
        }
    }

    if let Some(marker) = &config.proxy_marker {
        if marker.is_empty() {
            return Err(ConfigError::Validation(
                "proxy-marker cannot be empty when present".to_string(),
            ));
        }
    }

    if config.year_match == YearMatch::AnyWellFormed {
        tracing::warn!(
            "year-match = \"any-well-formed\" accepts records from any year; review this profile"
        );
    }

    Ok(())
}

/// Validates retry budgets
pub(crate) fn validate_retry_config(config: &RetryConfig) -> ConfigResult<()> {
    if config.network_retries > MAX_RETRIES || config.same_url_retries > MAX_RETRIES {
        return Err(ConfigError::Validation(format!(
            "retry counts must be <= {}, got network={} same-url={}",
            MAX_RETRIES, config.network_retries, config.same_url_retries
        )));
    }

    if config.wait_ms > MAX_WAIT_MS {
        return Err(ConfigError::Validation(format!(
            "wait-ms must be <= {}ms, got {}ms",
            MAX_WAIT_MS, config.wait_ms
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> ConfigResult<()> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> ConfigResult<()> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Parses a URL and requires an http(s) scheme with a host
fn validate_http_url(field: &str, value: &str) -> ConfigResult<Url> {
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

    Ok(url)
}

/// Compiles a configured regex, reporting the field it came from
pub(crate) fn compile_pattern(field: &str, pattern: &str) -> ConfigResult<Regex> {
    Regex::new(pattern)
        .map_err(|e| ConfigError::InvalidPattern(format!("{} '{}': {}", field, pattern, e)))
}

/// Basic email validation
fn validate_email(email: &str) -> ConfigResult<()> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
