//! Configuration file loading

use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Parses and validates configuration from TOML text
///
/// # Errors
///
/// * [`ConfigError::Parse`] for malformed TOML or unknown value types
/// * [`ConfigError::Validation`] / [`ConfigError::InvalidUrl`] for values out of range
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Reads a configuration file and validates it
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use a11y_crawl::config::load_config;
///
/// let config = load_config(Path::new("a11y-crawl.toml")).unwrap();
/// println!("Page budget: {}", config.scan.max_pages);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    parse_config(&std::fs::read_to_string(path)?)
}

/// Hex-encoded SHA-256 of configuration text
///
/// Logged at startup so a scan can be traced back to the exact configuration it ran with.
fn content_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Loads a configuration together with the hash of the exact text it was parsed from
///
/// # Returns
///
/// * `Ok((Config, String))` - Validated configuration and its SHA-256
/// * `Err(ConfigError)` - The file could not be read, parsed or validated
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok((config, content_hash(&content)))
}
