//! Scan submission and lookup

use crate::browser::BrowserProvider;
use crate::config::{validate_email, Config, MAX_PAGES_LIMIT};
use crate::crawler::{Coordinator, PageTester};
use crate::notify::{open_notifier, Notification};
use crate::report::{ArtifactSink, ReportCoordinator, ReportFont};
use crate::scan::machine::{start_scan, ScanDeps, ScanSettings};
use crate::scan::{IssueCounts, ReportRefs, ScanId, ScanOptions, ScanRecord, ScanStatus};
use crate::storage::{open_object_store, open_store};
use crate::url::normalize_root_url;
use crate::{A11yError, ScanError, ScanResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// A request to scan a site
#[derive(Debug, Clone, Default)]
pub struct ScanRequest {
    pub url: String,

    /// Requester address; receives confirmation, results and error notices
    pub email: String,

    /// Page budget; the configured default when absent
    pub max_pages: Option<u32>,

    pub options: ScanOptions,
}

/// A scan that has been accepted and spawned
#[derive(Debug)]
pub struct SubmittedScan {
    pub scan_id: ScanId,
    pub handle: JoinHandle<ScanResult<ScanRecord>>,
}

/// Progress view of a scan
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanProgress {
    pub scan_id: ScanId,
    pub url: String,
    pub status: ScanStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub pages_scanned: u32,
    pub pages_found: u32,
    pub issues: IssueCounts,
    pub accessibility_score: Option<u8>,
    pub reports: Option<ReportRefs>,
}

impl From<&ScanRecord> for ScanProgress {
    fn from(record: &ScanRecord) -> Self {
        Self {
            scan_id: record.scan_id,
            url: record.url.clone(),
            status: record.status,
            created_at: record.created_at,
            completed_at: record.completed_at,
            pages_scanned: record.pages_scanned,
            pages_found: record.pages_found,
            issues: record.issues,
            accessibility_score: record.accessibility_score,
            reports: record.reports.clone(),
        }
    }
}

/// Entry point for submitting and inspecting scans
#[derive(Clone)]
pub struct ScanService {
    deps: ScanDeps,
}

impl ScanService {
    pub fn new(deps: ScanDeps) -> Self {
        Self { deps }
    }

    /// Wires the service from configuration
    ///
    /// # Arguments
    ///
    /// * `config` - A validated configuration
    /// * `provider` - Browser provider used by every scan
    ///
    /// # Errors
    ///
    /// Fails when the engine script or report font cannot be read, or a store
    /// or notifier cannot be opened.
    pub fn from_config(config: &Config, provider: Arc<dyn BrowserProvider>) -> crate::Result<Self> {
        let tester = PageTester::from_file(
            Path::new(&config.browser.engine_script),
            config.scan.rule_tags.clone(),
            config.scan.audit_timeout(),
        )?;

        let font = match &config.storage.report_font {
            Some(path) => ReportFont::from_file(Path::new(path))?,
            None => ReportFont::bundled(),
        };

        let store = open_store(&config.storage)?;
        let sink = ArtifactSink::new(
            &config.storage.reports_dir,
            &config.storage.reports_base_url,
            open_object_store(&config.storage)?,
        );

        Ok(Self::new(ScanDeps {
            store,
            notifier: open_notifier(&config.notify)?,
            crawler: Arc::new(Coordinator::new(provider, tester)),
            reports: Arc::new(ReportCoordinator::with_sink(sink, font)),
            settings: Arc::new(ScanSettings::from_config(config)),
        }))
    }

    /// Validates a request, persists the pending record and spawns the scan
    ///
    /// The confirmation notification is sent before the scan starts; a
    /// failure to deliver it does not reject the request.
    ///
    /// # Errors
    ///
    /// * [`A11yError::Url`] for a root URL that is not absolute http(s)
    /// * [`A11yError::InvalidRequest`] for a bad email or page budget
    /// * [`A11yError::Scan`] if the pending record cannot be stored
    pub async fn submit(&self, request: ScanRequest) -> crate::Result<SubmittedScan> {
        let root = normalize_root_url(&request.url)?;

        validate_email(request.email.trim())
            .map_err(|e| A11yError::InvalidRequest(e.to_string()))?;
        if let Some(admin) = &request.options.admin_email {
            validate_email(admin).map_err(|e| A11yError::InvalidRequest(e.to_string()))?;
        }

        let max_pages = request
            .max_pages
            .unwrap_or(self.deps.settings.crawl.max_pages);
        if max_pages > MAX_PAGES_LIMIT {
            return Err(A11yError::InvalidRequest(format!(
                "max_pages must be at most {}, got {}",
                MAX_PAGES_LIMIT, max_pages
            )));
        }

        let record = ScanRecord::new(
            ScanId::new(),
            root.as_str(),
            request.email.trim(),
            self.deps.settings.deep_scan_threshold,
            request.options,
        );
        self.deps
            .store
            .create(&record)
            .await
            .map_err(ScanError::from)?;

        tracing::info!(
            "Accepted scan {} of {} for {} (max {} pages)",
            record.scan_id,
            record.url,
            record.requester,
            max_pages
        );

        if let Err(e) = self
            .deps
            .notifier
            .notify(&Notification::confirmation(&record))
            .await
        {
            tracing::warn!("Failed to send confirmation for {}: {}", record.scan_id, e);
        }

        let scan_id = record.scan_id;
        let handle = start_scan(self.deps.clone(), record, root, max_pages);

        Ok(SubmittedScan { scan_id, handle })
    }

    /// Full record of a scan
    pub async fn details(&self, scan_id: &ScanId) -> ScanResult<ScanRecord> {
        self.deps
            .store
            .read(scan_id)
            .await?
            .ok_or_else(|| ScanError::NotFound(scan_id.to_string()))
    }

    /// Progress of a scan without its page results
    pub async fn status(&self, scan_id: &ScanId) -> ScanResult<ScanProgress> {
        self.details(scan_id).await.map(|record| ScanProgress::from(&record))
    }
}
