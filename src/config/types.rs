use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for a11y-crawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,
    pub browser: BrowserConfig,
    pub storage: StorageConfig,
    pub notify: NotifyConfig,
}

/// Scan behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    /// Page budget of a single scan
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,

    /// Score at or above which a deep scan alert is raised
    #[serde(rename = "deep-scan-threshold", default = "default_deep_scan_threshold")]
    pub deep_scan_threshold: u8,

    /// Upper bound for a single page navigation (milliseconds)
    #[serde(rename = "navigation-timeout-ms", default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,

    /// Fixed delay between page load and audit (milliseconds)
    #[serde(rename = "settle-delay-ms", default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Upper bound for the in-page accessibility audit (milliseconds)
    #[serde(rename = "audit-timeout-ms", default = "default_audit_timeout_ms")]
    pub audit_timeout_ms: u64,

    /// Rule tags the audit is restricted to
    #[serde(rename = "rule-tags", default = "default_rule_tags")]
    pub rule_tags: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            deep_scan_threshold: default_deep_scan_threshold(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            audit_timeout_ms: default_audit_timeout_ms(),
            rule_tags: default_rule_tags(),
        }
    }
}

impl ScanConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn audit_timeout(&self) -> Duration {
        Duration::from_millis(self.audit_timeout_ms)
    }
}

/// Headless browser configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    /// User agent announced on every page
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    #[serde(rename = "viewport-width", default = "default_viewport_width")]
    pub viewport_width: u32,

    #[serde(rename = "viewport-height", default = "default_viewport_height")]
    pub viewport_height: u32,

    /// Path to the accessibility rule engine script (axe.min.js)
    #[serde(rename = "engine-script")]
    pub engine_script: String,

    /// Chrome/Chromium executable; auto-detected when absent
    #[serde(default)]
    pub executable: Option<String>,
}

/// Persistence and report artifact configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Directory receiving the `pdf/` and `csv/` report folders
    #[serde(rename = "reports-dir")]
    pub reports_dir: String,

    /// Public base URL under which `/reports/...` is served
    #[serde(rename = "reports-base-url")]
    pub reports_base_url: String,

    /// TrueType font for PDF reports; the bundled DejaVu Sans when absent
    #[serde(rename = "report-font", default)]
    pub report_font: Option<String>,

    /// Optional object store; the local database is the fallback
    #[serde(default)]
    pub remote: Option<RemoteStoreConfig>,
}

/// HTTP object store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteStoreConfig {
    /// Base URL objects are PUT to and fetched from
    pub endpoint: String,

    /// Base URL objects are publicly reachable at
    #[serde(rename = "public-url")]
    pub public_url: String,

    /// Bearer token sent with every request
    #[serde(default)]
    pub token: Option<String>,
}

/// Notification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    /// Recipient of admin result copies and deep scan alerts
    #[serde(rename = "admin-email")]
    pub admin_email: String,

    /// Recipient of detailed failure reports
    #[serde(rename = "error-email")]
    pub error_email: String,

    /// Webhook receiving every notification as JSON; logged only when absent
    #[serde(rename = "webhook-url", default)]
    pub webhook_url: Option<String>,
}

fn default_max_pages() -> u32 {
    5
}

fn default_deep_scan_threshold() -> u8 {
    90
}

fn default_navigation_timeout_ms() -> u64 {
    30_000
}

fn default_settle_delay_ms() -> u64 {
    2_000
}

fn default_audit_timeout_ms() -> u64 {
    60_000
}

fn default_rule_tags() -> Vec<String> {
    ["wcag2a", "wcag2aa", "wcag21a", "wcag21aa", "best-practice"]
        .iter()
        .map(|t| t.to_string())
        .collect()
}

fn default_user_agent() -> String {
    format!("a11y-crawl/{} (accessibility scanner)", env!("CARGO_PKG_VERSION"))
}

fn default_viewport_width() -> u32 {
    1280
}

fn default_viewport_height() -> u32 {
    800
}
