//! a11y-crawl: a bounded accessibility crawler
//!
//! This crate crawls a small, same-host slice of a website in a headless browser,
//! audits every page with an injected accessibility rule engine, scores the
//! aggregated findings and drives report generation and notifications.

pub mod browser;
pub mod config;
pub mod crawler;
pub mod notify;
pub mod report;
pub mod scan;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for a11y-crawl operations
#[derive(Debug, Error)]
pub enum A11yError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Notification error: {0}")]
    Notify(#[from] notify::NotifyError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors scoped to a single scan.
///
/// Any of these aborts the scan and moves it to `failed`. They are never
/// retried inside the engine.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Failed to launch browser: {0}")]
    Launch(#[source] browser::BrowserError),

    #[error("Browser session error: {0}")]
    Browser(#[from] browser::BrowserError),

    #[error("Report generation failed: {0}")]
    Report(#[from] report::ReportError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Invalid status transition for scan {scan_id}: {from} -> {to}")]
    InvalidTransition {
        scan_id: String,
        from: scan::ScanStatus,
        to: scan::ScanStatus,
    },

    #[error("Scan not found: {0}")]
    NotFound(String),

    #[error("Invalid scan identifier: {0}")]
    InvalidScanId(String),
}

/// Errors scoped to a single page of a crawl.
///
/// These are recorded as a failed page result and never abort the crawl.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("Failed to open page: {0}")]
    Open(#[source] browser::BrowserError),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Navigation to {url} timed out after {timeout_ms}ms")]
    NavigationTimeout { url: String, timeout_ms: u64 },

    #[error("Accessibility engine error: {0}")]
    Engine(String),

    #[error("Accessibility audit timed out after {timeout_ms}ms")]
    AuditTimeout { timeout_ms: u64 },

    #[error("Malformed audit verdict: {0}")]
    Verdict(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for a11y-crawl operations
pub type Result<T> = std::result::Result<T, A11yError>;

/// Result type alias for scan-scoped operations
pub type ScanResult<T> = std::result::Result<T, ScanError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use scan::{start_scan, ScanId, ScanRecord, ScanService, ScanStatus};
pub use url::{filter_link, normalize_root_url};
