use crate::config::types::{
    BrowserConfig, Config, NotifyConfig, RemoteStoreConfig, ScanConfig, StorageConfig,
};
use crate::ConfigError;
use url::Url;

/// Hard ceiling for the page budget of a single scan
pub const MAX_PAGES_LIMIT: u32 = 500;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_scan_config(&config.scan)?;
    validate_browser_config(&config.browser)?;
    validate_storage_config(&config.storage)?;
    validate_notify_config(&config.notify)?;
    Ok(())
}

/// Validates scan configuration
fn validate_scan_config(config: &ScanConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 || config.max_pages > MAX_PAGES_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max_pages must be between 1 and {}, got {}",
            MAX_PAGES_LIMIT, config.max_pages
        )));
    }

    if config.deep_scan_threshold > 100 {
        return Err(ConfigError::Validation(format!(
            "deep_scan_threshold must be between 0 and 100, got {}",
            config.deep_scan_threshold
        )));
    }

    if config.navigation_timeout_ms < 1_000 {
        return Err(ConfigError::Validation(format!(
            "navigation_timeout_ms must be >= 1000ms, got {}ms",
            config.navigation_timeout_ms
        )));
    }

    if config.audit_timeout_ms < 1_000 {
        return Err(ConfigError::Validation(format!(
            "audit_timeout_ms must be >= 1000ms, got {}ms",
            config.audit_timeout_ms
        )));
    }

    if config.rule_tags.is_empty() {
        return Err(ConfigError::Validation(
            "rule_tags cannot be empty".to_string(),
        ));
    }

    if config.rule_tags.iter().any(|t| t.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "rule_tags cannot contain empty tags".to_string(),
        ));
    }

    Ok(())
}

/// Validates browser configuration
fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.viewport_width < 320 || config.viewport_height < 240 {
        return Err(ConfigError::Validation(format!(
            "viewport must be at least 320x240, got {}x{}",
            config.viewport_width, config.viewport_height
        )));
    }

    if config.engine_script.is_empty() {
        return Err(ConfigError::Validation(
            "engine_script cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.reports_dir.is_empty() {
        return Err(ConfigError::Validation(
            "reports_dir cannot be empty".to_string(),
        ));
    }

    validate_http_url("reports_base_url", &config.reports_base_url)?;

    if let Some(remote) = &config.remote {
        validate_remote_config(remote)?;
    }

    Ok(())
}

fn validate_remote_config(config: &RemoteStoreConfig) -> Result<(), ConfigError> {
    validate_http_url("remote.endpoint", &config.endpoint)?;
    validate_http_url("remote.public_url", &config.public_url)?;
    Ok(())
}

/// Validates notification configuration
fn validate_notify_config(config: &NotifyConfig) -> Result<(), ConfigError> {
    validate_email(&config.admin_email)?;
    validate_email(&config.error_email)?;

    if let Some(webhook) = &config.webhook_url {
        validate_http_url("webhook_url", webhook)?;
    }

    Ok(())
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {}: {}", field, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            field, value
        )));
    }

    Ok(())
}

/// Basic email validation
///
/// Also used for requester addresses submitted with a scan.
pub fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "email address cannot be empty".to_string(),
        ));
    }

    if email.chars().any(char::is_whitespace) {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    // Basic email format check: must contain @ and have text on both sides
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

    // Domain part should contain at least one dot with text around it
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
