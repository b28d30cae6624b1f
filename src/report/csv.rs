//! Per-element CSV export

use super::{ArtifactSink, ReportError, ReportKind, ReportRef, ReportRenderer, ReportResult, ScanSummary};
use crate::scan::{PageResult, ScanId, Violation, ViolationNode};
use async_trait::async_trait;
use std::sync::Arc;

const HEADER: [&str; 9] = [
    "Page URL",
    "Issue ID",
    "Description",
    "Impact",
    "WCAG Criteria",
    "Help Text",
    "Help URL",
    "HTML",
    "Target",
];

/// Renders the CSV export of a scan
///
/// One row per affected element, or a single row for a violation that
/// reports no elements. Failed pages are skipped. Rows end in CRLF.
///
/// # Example
///
/// ```
/// use a11y_crawl::report::render_csv;
///
/// let csv = render_csv(&[]).unwrap();
/// assert!(csv.starts_with(b"Page URL,Issue ID,"));
/// ```
pub fn render_csv(results: &[PageResult]) -> Result<Vec<u8>, ::csv::Error> {
    let mut writer = ::csv::WriterBuilder::new()
        .terminator(::csv::Terminator::CRLF)
        .from_writer(Vec::new());
    writer.write_record(HEADER)?;

    for page in results.iter().filter(|p| p.is_success()) {
        for violation in &page.violations {
            if violation.nodes.is_empty() {
                writer.write_record(&violation_row(&page.url, violation, None))?;
            }
            for node in &violation.nodes {
                writer.write_record(&violation_row(&page.url, violation, Some(node)))?;
            }
        }
    }

    writer
        .into_inner()
        .map_err(|e| ::csv::Error::from(e.into_error()))
}

fn violation_row(page: &str, violation: &Violation, node: Option<&ViolationNode>) -> [String; 9] {
    let (html, target) = match node {
        Some(node) => (node.html.clone(), node.target.join(", ")),
        None => (String::new(), String::new()),
    };

    [
        page.to_string(),
        violation.id.clone(),
        violation.description.clone(),
        violation.impact.as_deref().unwrap_or("unknown").to_string(),
        violation.wcag_tags().collect::<Vec<_>>().join(", "),
        violation.help.clone(),
        violation.help_url.clone(),
        html,
        target,
    ]
}

/// CSV renderer writing through an [`ArtifactSink`]
pub struct CsvRenderer {
    sink: Arc<ArtifactSink>,
}

impl CsvRenderer {
    pub fn new(sink: Arc<ArtifactSink>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl ReportRenderer for CsvRenderer {
    fn kind(&self) -> ReportKind {
        ReportKind::Csv
    }

    async fn render(
        &self,
        scan_id: &ScanId,
        _url: &str,
        results: &[PageResult],
        _summary: &ScanSummary,
    ) -> ReportResult<ReportRef> {
        let body = render_csv(results).map_err(|e| ReportError::Render {
            kind: ReportKind::Csv,
            message: e.to_string(),
        })?;
        self.sink.store(ReportKind::Csv, scan_id, body).await
    }
}
