//! Report module for turning finished scans into downloadable artifacts
//!
//! This module handles:
//! - Rendering the per-element CSV export
//! - Rendering the PDF summary report
//! - Storing artifacts locally and optionally in the object store
//! - Running both renderers for a scan and collecting their references

mod csv;
mod pdf;

pub use self::csv::{render_csv, CsvRenderer};
pub use self::pdf::{render_pdf, PdfRenderer, ReportFont};

use crate::scan::{IssueCounts, PageResult, ReportRefs, ScanId};
use crate::storage::ObjectStore;
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while producing reports
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to render {kind} report: {message}")]
    Render { kind: ReportKind, message: String },

    #[error("Failed to store {kind} report: {message}")]
    Store { kind: ReportKind, message: String },

    #[error("Report generation failed for {}: {details}", kinds(.failed))]
    Failed {
        failed: Vec<ReportKind>,
        details: String,
    },
}

fn kinds(kinds: &[ReportKind]) -> String {
    kinds
        .iter()
        .map(ReportKind::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for report operations
pub type ReportResult<T> = Result<T, ReportError>;

/// The two artifacts produced for every completed scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    Pdf,
    Csv,
}

impl ReportKind {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Csv => "csv",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Csv => "text/csv",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Scan-level figures printed in the reports
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanSummary {
    pub pages_scanned: u32,
    pub issues: IssueCounts,
    pub accessibility_score: Option<u8>,
}

/// Where a rendered artifact ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRef {
    pub kind: ReportKind,

    /// Local file the artifact was written to
    pub path: PathBuf,

    /// Dereferenceable URL handed to requesters
    pub url: String,
}

/// Renders one kind of report for a finished scan
#[async_trait]
pub trait ReportRenderer: Send + Sync {
    fn kind(&self) -> ReportKind;

    /// Renders and stores the artifact
    ///
    /// Failed pages (status other than 200) are left out.
    async fn render(
        &self,
        scan_id: &ScanId,
        url: &str,
        results: &[PageResult],
        summary: &ScanSummary,
    ) -> ReportResult<ReportRef>;
}

/// Destination for rendered artifacts
///
/// Files are always written to `<reports-dir>/<kind>/<scan-id>.<ext>`. When an
/// object store is configured the file is also uploaded to
/// `reports/<kind>/<scan-id>.<ext>` and its public URL is returned; a failed
/// upload falls back to the local URL.
#[derive(Debug, Clone)]
pub struct ArtifactSink {
    reports_dir: PathBuf,
    base_url: String,
    remote: Option<ObjectStore>,
}

impl ArtifactSink {
    pub fn new(reports_dir: impl Into<PathBuf>, base_url: &str, remote: Option<ObjectStore>) -> Self {
        Self {
            reports_dir: reports_dir.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            remote,
        }
    }

    fn file_name(kind: ReportKind, scan_id: &ScanId) -> String {
        format!("{}.{}", scan_id, kind.extension())
    }

    /// Writes an artifact and returns its reference
    pub async fn store(&self, kind: ReportKind, scan_id: &ScanId, body: Vec<u8>) -> ReportResult<ReportRef> {
        let store_error = |e: std::io::Error| ReportError::Store {
            kind,
            message: e.to_string(),
        };

        let dir = self.reports_dir.join(kind.extension());
        tokio::fs::create_dir_all(&dir).await.map_err(store_error)?;

        let name = Self::file_name(kind, scan_id);
        let path = dir.join(&name);
        tokio::fs::write(&path, &body).await.map_err(store_error)?;

        let key = format!("reports/{}/{}", kind.extension(), name);
        let local_url = format!("{}/{}", self.base_url, key);

        let url = match &self.remote {
            Some(remote) => match remote.put(&key, body, kind.content_type()).await {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!("Upload of {} failed, serving locally: {}", key, e);
                    local_url
                }
            },
            None => local_url,
        };

        tracing::debug!("Stored {} report for {} at {}", kind, scan_id, path.display());

        Ok(ReportRef { kind, path, url })
    }
}

/// Runs the PDF and CSV renderers for a scan
pub struct ReportCoordinator {
    pdf: Arc<dyn ReportRenderer>,
    csv: Arc<dyn ReportRenderer>,
}

impl ReportCoordinator {
    pub fn new(pdf: Arc<dyn ReportRenderer>, csv: Arc<dyn ReportRenderer>) -> Self {
        Self { pdf, csv }
    }

    /// Builds the default PDF and CSV renderers on a shared sink
    pub fn with_sink(sink: ArtifactSink, font: ReportFont) -> Self {
        let sink = Arc::new(sink);
        Self::new(
            Arc::new(PdfRenderer::new(sink.clone(), font)),
            Arc::new(CsvRenderer::new(sink)),
        )
    }

    /// Generates both reports concurrently
    ///
    /// # Returns
    ///
    /// * `Ok(ReportRefs)` - Both artifacts were produced
    /// * `Err(ReportError::Failed)` - At least one renderer failed; the error names which
    pub async fn generate(
        &self,
        scan_id: &ScanId,
        url: &str,
        results: &[PageResult],
        summary: &ScanSummary,
    ) -> ReportResult<ReportRefs> {
        let (pdf, csv) = tokio::join!(
            self.pdf.render(scan_id, url, results, summary),
            self.csv.render(scan_id, url, results, summary),
        );

        match (pdf, csv) {
            (Ok(pdf), Ok(csv)) => {
                tracing::info!("Reports generated for scan {}", scan_id);
                Ok(ReportRefs {
                    pdf: pdf.url,
                    csv: csv.url,
                })
            }
            (pdf, csv) => {
                let mut failed = Vec::new();
                let mut details = Vec::new();
                for (kind, result) in [(ReportKind::Pdf, pdf), (ReportKind::Csv, csv)] {
                    if let Err(e) = result {
                        failed.push(kind);
                        details.push(e.to_string());
                    }
                }
                Err(ReportError::Failed {
                    failed,
                    details: details.join("; "),
                })
            }
        }
    }
}
