//! Scan lifecycle
//!
//! One scan runs as one spawned task that walks its record through
//! `pending -> running -> completed | failed`. The task is the only writer
//! of its record.

use crate::crawler::{Coordinator, CrawlContext, CrawlSettings};
use crate::notify::{Notification, Notifier};
use crate::report::{ReportCoordinator, ScanSummary};
use crate::scan::{accessibility_score, ReportRefs, ScanId, ScanPatch, ScanRecord, ScanStatus};
use crate::storage::ScanStore;
use crate::{ScanError, ScanResult};
use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinHandle;
use url::Url;

/// Per-deployment scan settings
#[derive(Debug, Clone)]
pub struct ScanSettings {
    /// Crawl settings; `crawl.max_pages` is the default budget
    pub crawl: CrawlSettings,

    /// Threshold stamped on new records
    pub deep_scan_threshold: u8,

    /// Default recipient of admin copies and deep scan alerts
    pub admin_email: String,

    /// Recipient of detailed failure reports
    pub error_email: String,
}

impl ScanSettings {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            crawl: CrawlSettings::from_config(config, config.scan.max_pages),
            deep_scan_threshold: config.scan.deep_scan_threshold,
            admin_email: config.notify.admin_email.clone(),
            error_email: config.notify.error_email.clone(),
        }
    }
}

/// Collaborators shared by all scans
#[derive(Clone)]
pub struct ScanDeps {
    pub store: Arc<dyn ScanStore>,
    pub notifier: Arc<dyn Notifier>,
    pub crawler: Arc<Coordinator>,
    pub reports: Arc<ReportCoordinator>,
    pub settings: Arc<ScanSettings>,
}

/// Spawns the scan of an already persisted pending record
///
/// Returns immediately; the handle resolves to the final record, or to the
/// error that failed the scan.
///
/// # Arguments
///
/// * `deps` - Shared collaborators
/// * `record` - The `pending` record exactly as the caller persisted it
/// * `root` - Normalized root URL
/// * `max_pages` - Page budget of this scan
pub fn start_scan(
    deps: ScanDeps,
    record: ScanRecord,
    root: Url,
    max_pages: u32,
) -> JoinHandle<ScanResult<ScanRecord>> {
    tokio::spawn(async move {
        let scan_id = record.scan_id;
        let result = run_scan(deps, record, root, max_pages).await;
        if let Err(e) = &result {
            tracing::error!("Scan {} failed: {}", scan_id, e);
        }
        result
    })
}

/// Runs a scan to completion on the current task
///
/// The task owns its record from here on. Every failure after this point,
/// including one to persist the `running` status, ends in `failed` with the
/// operations address and the requester notified.
pub async fn run_scan(
    deps: ScanDeps,
    record: ScanRecord,
    root: Url,
    max_pages: u32,
) -> ScanResult<ScanRecord> {
    let mut run = ScanRun { deps, record };
    run.begin().await?;

    let mut context = CrawlContext::for_root(&root);
    match run.execute(&root, max_pages, &mut context).await {
        Ok(()) => {
            run.announce_completion().await;
            Ok(run.record)
        }
        Err(e) => {
            run.fail(&e, &context).await;
            Err(e)
        }
    }
}

/// In-memory view of one scan's record while it runs
struct ScanRun {
    deps: ScanDeps,
    record: ScanRecord,
}

impl ScanRun {
    fn check_transition(&self, next: ScanStatus) -> ScanResult<()> {
        if self.record.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(ScanError::InvalidTransition {
                scan_id: self.record.scan_id.to_string(),
                from: self.record.status,
                to: next,
            })
        }
    }

    /// pending -> running
    async fn begin(&mut self) -> ScanResult<()> {
        self.check_transition(ScanStatus::Running)?;
        self.record.status = ScanStatus::Running;

        tracing::info!("Scan {} running for {}", self.record.scan_id, self.record.url);

        if let Err(e) = self
            .deps
            .store
            .update(&self.record.scan_id, ScanPatch::status(ScanStatus::Running))
            .await
        {
            let e = ScanError::from(e);
            self.fail(&e, &CrawlContext::default()).await;
            return Err(e);
        }
        Ok(())
    }

    /// Crawl, score, report and persist the completed record
    async fn execute(&mut self, root: &Url, max_pages: u32, context: &mut CrawlContext) -> ScanResult<()> {
        let settings = CrawlSettings {
            max_pages,
            ..self.deps.settings.crawl.clone()
        };
        self.deps.crawler.crawl(context, root, &settings).await?;

        let score = accessibility_score(&context.issues, context.pages_scanned);
        tracing::info!(
            "Scan {} scored {}/100 over {} pages ({} issues)",
            self.record.scan_id,
            score,
            context.pages_scanned,
            context.issues.total
        );

        let summary = ScanSummary {
            pages_scanned: context.pages_scanned,
            issues: context.issues,
            accessibility_score: Some(score),
        };
        let reports = self
            .deps
            .reports
            .generate(&self.record.scan_id, &self.record.url, &context.results, &summary)
            .await?;

        self.complete(context, score, reports).await
    }

    /// running -> completed, deep scan flag included in the same write
    async fn complete(&mut self, context: &CrawlContext, score: u8, reports: ReportRefs) -> ScanResult<()> {
        self.check_transition(ScanStatus::Completed)?;

        let patch = ScanPatch {
            status: Some(ScanStatus::Completed),
            completed_at: Some(Utc::now()),
            pages_scanned: Some(context.pages_scanned),
            pages_found: Some(context.pages_found()),
            issues: Some(context.issues),
            results: Some(context.results.clone()),
            accessibility_score: Some(score),
            deep_scan_triggered: Some(score >= self.record.deep_scan_threshold),
            reports: Some(reports),
        };

        self.deps
            .store
            .update(&self.record.scan_id, patch.clone())
            .await?;
        self.record.apply(patch);

        tracing::info!("Scan {} completed", self.record.scan_id);
        Ok(())
    }

    fn admin_email(&self) -> &str {
        self.record
            .admin_email
            .as_deref()
            .unwrap_or(&self.deps.settings.admin_email)
    }

    /// Side effects of a completed scan; failures are only logged
    async fn announce_completion(&self) {
        self.send(Notification::results(&self.record)).await;

        if self.record.send_copy_to_admin {
            self.send(Notification::admin_results(self.admin_email(), &self.record))
                .await;
        }

        if self.record.deep_scan_triggered {
            if let Some(score) = self.record.accessibility_score {
                tracing::info!(
                    "Scan {} reached the deep scan threshold ({} >= {})",
                    self.record.scan_id,
                    score,
                    self.record.deep_scan_threshold
                );
                self.send(Notification::deep_scan_alert(
                    self.admin_email(),
                    &self.record,
                    score,
                ))
                .await;
            }
        }
    }

    /// running -> failed, keeping whatever the crawl accumulated
    async fn fail(&mut self, error: &ScanError, context: &CrawlContext) {
        if let Err(e) = self.check_transition(ScanStatus::Failed) {
            tracing::error!("Cannot mark scan as failed: {}", e);
            return;
        }

        let patch = ScanPatch {
            status: Some(ScanStatus::Failed),
            completed_at: Some(Utc::now()),
            pages_scanned: Some(context.pages_scanned),
            pages_found: Some(context.pages_found()),
            issues: Some(context.issues),
            results: Some(context.results.clone()),
            ..ScanPatch::default()
        };

        if let Err(e) = self
            .deps
            .store
            .update(&self.record.scan_id, patch.clone())
            .await
        {
            tracing::error!(
                "Failed to persist failure of scan {}: {}",
                self.record.scan_id,
                e
            );
        }
        self.record.apply(patch);

        let detail = error.to_string();
        self.send(Notification::operational_error(
            &self.deps.settings.error_email,
            &self.record,
            &detail,
        ))
        .await;
        self.send(Notification::requester_error(&self.record)).await;
    }

    async fn send(&self, notification: Notification) {
        if let Err(e) = self.deps.notifier.notify(&notification).await {
            tracing::warn!(
                "Failed to send {} notification for scan {}: {}",
                notification.kind,
                self.record.scan_id,
                e
            );
        }
    }
}
