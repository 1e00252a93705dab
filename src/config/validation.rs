use crate::config::types::{
    CircuitBreakerConfig, CompletionConfig, Config, CrawlerConfig, OutputConfig,
    ResilienceConfig, SearchConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_resilience_config(&config.resilience)?;
    validate_circuit_breaker_config(&config.circuit_breaker)?;
    validate_search_config(&config.search)?;
    validate_completion_config(&config.completion)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 || config.max_pages > 10_000 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be between 1 and 10000, got {}",
            config.max_pages
        )));
    }

    if config.rate_limit_ms > 60_000 {
        return Err(ConfigError::Validation(format!(
            "rate_limit_ms must be <= 60000ms, got {}ms",
            config.rate_limit_ms
        )));
    }

    if config.content_limit < 1_000 {
        return Err(ConfigError::Validation(format!(
            "content_limit must be >= 1000 characters, got {}",
            config.content_limit
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
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

/// Validates retry and timeout settings
fn validate_resilience_config(config: &ResilienceConfig) -> Result<(), ConfigError> {
    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    for (name, value) in [
        ("fetch_timeout_ms", config.fetch_timeout_ms),
        ("completion_timeout_ms", config.completion_timeout_ms),
    ] {
        if value == Some(0) {
            return Err(ConfigError::Validation(format!("{} must be > 0", name)));
        }
    }

    Ok(())
}

fn validate_circuit_breaker_config(config: &CircuitBreakerConfig) -> Result<(), ConfigError> {
    if config.failure_threshold < 1 {
        return Err(ConfigError::Validation(format!(
            "failure_threshold must be >= 1, got {}",
            config.failure_threshold
        )));
    }

    if config.reset_timeout_ms < 1 {
        return Err(ConfigError::Validation(
            "reset_timeout_ms must be >= 1ms".to_string(),
        ));
    }

    Ok(())
}

fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    if config.strategy_timeout_ms < 1 {
        return Err(ConfigError::Validation(
            "strategy_timeout_ms must be >= 1ms".to_string(),
        ));
    }

    Url::parse(&config.devdocs_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid devdocs_url: {}", e)))?;

    if !config.readthedocs_template.contains("{framework}") {
        return Err(ConfigError::Validation(format!(
            "readthedocs_template must contain '{{framework}}', got '{}'",
            config.readthedocs_template
        )));
    }

    let sample = config.readthedocs_template.replace("{framework}", "sample");
    Url::parse(&sample).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid readthedocs_template: {}", e))
    })?;

    Ok(())
}

fn validate_completion_config(config: &CompletionConfig) -> Result<(), ConfigError> {
    Url::parse(&config.endpoint)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid completion endpoint: {}", e)))?;

    if config.model.trim().is_empty() {
        return Err(ConfigError::Validation(
            "completion model cannot be empty".to_string(),
        ));
    }

    if config.api_key_env.trim().is_empty() {
        return Err(ConfigError::Validation(
            "api_key_env cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    // Must contain a single @ with text on both sides
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
