//! Scan records and the per-page data they carry
//!
//! Field names serialize in camelCase so that stored records and webhook
//! payloads read the same as the rule engine's own JSON.

use crate::scan::ScanStatus;
use crate::{PageError, ScanError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::ops::AddAssign;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque, immutable identifier of a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanId(Uuid);

impl ScanId {
    /// Generates a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ScanId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for ScanId {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| ScanError::InvalidScanId(s.to_string()))
    }
}

impl fmt::Display for ScanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Severity bucket an engine impact label is remapped into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

impl Severity {
    /// Maps an engine-native impact label
    ///
    /// | Impact | Bucket |
    /// |--------|--------|
    /// | critical, serious | Critical |
    /// | moderate, minor | Warning |
    /// | anything else, or missing | Info |
    pub fn from_impact(impact: Option<&str>) -> Self {
        match impact {
            Some("critical") | Some("serious") => Self::Critical,
            Some("moderate") | Some("minor") => Self::Warning,
            _ => Self::Info,
        }
    }
}

/// Aggregate violation counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCounts {
    pub total: u64,
    pub critical: u64,
    pub warning: u64,
    pub info: u64,
}

impl IssueCounts {
    /// Records `count` affected elements of the given severity
    pub fn record(&mut self, severity: Severity, count: u64) {
        self.total += count;
        match severity {
            Severity::Critical => self.critical += count,
            Severity::Warning => self.warning += count,
            Severity::Info => self.info += count,
        }
    }

    /// Counts of a list of violations
    pub fn from_violations(violations: &[Violation]) -> Self {
        let mut counts = Self::default();
        for violation in violations {
            counts.record(violation.severity(), violation.affected_elements());
        }
        counts
    }
}

impl AddAssign for IssueCounts {
    fn add_assign(&mut self, other: Self) {
        self.total += other.total;
        self.critical += other.critical;
        self.warning += other.warning;
        self.info += other.info;
    }
}

/// One element affected by a violation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViolationNode {
    /// DOM locator; nested frame / shadow-root chains are joined with ` > `
    #[serde(default, deserialize_with = "flatten_targets")]
    pub target: Vec<String>,

    /// Serialized markup of the element
    #[serde(default)]
    pub html: String,
}

/// One rule failure reported by the accessibility engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub id: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub help: String,

    #[serde(default)]
    pub help_url: String,

    /// Engine-native impact label (critical, serious, moderate, minor)
    #[serde(default)]
    pub impact: Option<String>,

    #[serde(default)]
    pub nodes: Vec<ViolationNode>,

    #[serde(default)]
    pub tags: Vec<String>,
}

impl Violation {
    pub fn severity(&self) -> Severity {
        Severity::from_impact(self.impact.as_deref())
    }

    /// Number of affected elements; a violation without nodes counts once
    pub fn affected_elements(&self) -> u64 {
        self.nodes.len().max(1) as u64
    }

    /// Tags that reference a WCAG criterion
    pub fn wcag_tags(&self) -> impl Iterator<Item = &str> {
        self.tags
            .iter()
            .map(String::as_str)
            .filter(|t| t.contains("wcag"))
    }
}

/// The audit of one crawled URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult {
    pub url: String,
    pub scanned_at: DateTime<Utc>,

    /// HTTP status of the audited document, [`PageResult::STATUS_FAILED`]
    /// when no audit was produced
    pub status: u16,

    pub violation_counts: IssueCounts,

    #[serde(default)]
    pub violations: Vec<Violation>,

    #[serde(default)]
    pub links: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageResult {
    /// Status recorded when the browser reports none for the document
    pub const STATUS_OK: u16 = 200;

    /// Sentinel status of a page that produced no usable audit
    pub const STATUS_FAILED: u16 = 0;

    pub fn success(url: impl Into<String>, violations: Vec<Violation>, links: Vec<String>) -> Self {
        Self {
            url: url.into(),
            scanned_at: Utc::now(),
            status: Self::STATUS_OK,
            violation_counts: IssueCounts::from_violations(&violations),
            violations,
            links,
            error: None,
        }
    }

    pub fn failure(url: impl Into<String>, error: &PageError) -> Self {
        Self {
            url: url.into(),
            scanned_at: Utc::now(),
            status: Self::STATUS_FAILED,
            violation_counts: IssueCounts::default(),
            violations: Vec::new(),
            links: Vec::new(),
            error: Some(error.to_string()),
        }
    }

    /// Records the HTTP status the document was served with
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// True when the page was audited, whatever its HTTP status
    pub fn is_success(&self) -> bool {
        self.status != Self::STATUS_FAILED
    }
}

/// Dereferenceable locations of the two report artifacts of a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRefs {
    pub pdf: String,
    pub csv: String,
}

/// Requester-supplied options captured when a scan is created
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Also send the results to the admin address
    pub send_copy_to_admin: bool,

    /// Admin address overriding the configured one
    pub admin_email: Option<String>,
}

/// The persisted state of one scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    pub scan_id: ScanId,
    pub url: String,
    pub requester: String,
    pub status: ScanStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub pages_scanned: u32,
    pub pages_found: u32,
    pub issues: IssueCounts,
    pub results: Vec<PageResult>,
    pub accessibility_score: Option<u8>,
    pub deep_scan_threshold: u8,
    pub deep_scan_triggered: bool,
    pub send_copy_to_admin: bool,
    pub admin_email: Option<String>,
    pub reports: Option<ReportRefs>,
}

impl ScanRecord {
    /// Creates a pending record
    pub fn new(
        scan_id: ScanId,
        url: impl Into<String>,
        requester: impl Into<String>,
        deep_scan_threshold: u8,
        options: ScanOptions,
    ) -> Self {
        Self {
            scan_id,
            url: url.into(),
            requester: requester.into(),
            status: ScanStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
            pages_scanned: 0,
            pages_found: 0,
            issues: IssueCounts::default(),
            results: Vec::new(),
            accessibility_score: None,
            deep_scan_threshold,
            deep_scan_triggered: false,
            send_copy_to_admin: options.send_copy_to_admin,
            admin_email: options.admin_email,
            reports: None,
        }
    }

    /// Merges a partial update into the record
    ///
    /// This is a plain field overwrite; lifecycle rules are enforced by the
    /// scan state machine before a patch is produced.
    pub fn apply(&mut self, patch: ScanPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(completed_at) = patch.completed_at {
            self.completed_at = Some(completed_at);
        }
        if let Some(pages_scanned) = patch.pages_scanned {
            self.pages_scanned = pages_scanned;
        }
        if let Some(pages_found) = patch.pages_found {
            self.pages_found = pages_found;
        }
        if let Some(issues) = patch.issues {
            self.issues = issues;
        }
        if let Some(results) = patch.results {
            self.results = results;
        }
        if let Some(score) = patch.accessibility_score {
            self.accessibility_score = Some(score);
        }
        if let Some(triggered) = patch.deep_scan_triggered {
            self.deep_scan_triggered = triggered;
        }
        if let Some(reports) = patch.reports {
            self.reports = Some(reports);
        }
    }
}

/// A partial update of a [`ScanRecord`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanPatch {
    pub status: Option<ScanStatus>,
    pub completed_at: Option<DateTime<Utc>>,
    pub pages_scanned: Option<u32>,
    pub pages_found: Option<u32>,
    pub issues: Option<IssueCounts>,
    pub results: Option<Vec<PageResult>>,
    pub accessibility_score: Option<u8>,
    pub deep_scan_triggered: Option<bool>,
    pub reports: Option<ReportRefs>,
}

impl ScanPatch {
    pub fn status(status: ScanStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

/// Accepts both `["#a"]` and `[["iframe", "#a"]]` locator shapes
fn flatten_targets<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Target {
        Selector(String),
        Chain(Vec<Target>),
    }

    fn join(target: Target) -> String {
        match target {
            Target::Selector(s) => s,
            Target::Chain(parts) => parts.into_iter().map(join).collect::<Vec<_>>().join(" > "),
        }
    }

    let targets = Option::<Vec<Target>>::deserialize(deserializer)?;
    Ok(targets
        .unwrap_or_default()
        .into_iter()
        .map(join)
        .collect())
}
