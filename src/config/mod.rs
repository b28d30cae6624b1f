//! Configuration module for a11y-crawl
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use a11y_crawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("a11y-crawl.toml")).unwrap();
//! println!("Deep scan threshold: {}", config.scan.deep_scan_threshold);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BrowserConfig, Config, NotifyConfig, RemoteStoreConfig, ScanConfig, StorageConfig,
};

// Re-export parser functions
pub use parser::{load_config, load_config_with_hash, parse_config};
pub use validation::{validate_email, MAX_PAGES_LIMIT};
