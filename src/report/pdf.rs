//! PDF summary report
//!
//! The report is laid out as positioned text lines first, then set with
//! printpdf in an embedded TrueType font so any text the font has glyphs for
//! survives into the document.

use super::{ArtifactSink, ReportError, ReportKind, ReportRef, ReportRenderer, ReportResult, ScanSummary};
use crate::scan::{PageResult, ScanId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use printpdf::{Mm, PdfDocument, Pt};
use std::path::Path;
use std::sync::Arc;

const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN: f32 = 50.0;
const FOOTER_Y: f32 = 30.0;

const TITLE_SIZE: f32 = 20.0;
const HEADING_SIZE: f32 = 14.0;
const BODY_SIZE: f32 = 12.0;
const DETAIL_SIZE: f32 = 9.0;
const FOOTER_SIZE: f32 = 8.0;

static BUNDLED_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

/// TrueType font the PDF report is set in
#[derive(Clone)]
pub struct ReportFont(Arc<[u8]>);

impl ReportFont {
    /// DejaVu Sans, shipped with the crate
    pub fn bundled() -> Self {
        Self(Arc::from(BUNDLED_FONT))
    }

    /// Loads a TrueType font from disk, e.g. one with CJK coverage
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        Ok(Self(Arc::from(std::fs::read(path)?)))
    }
}

impl Default for ReportFont {
    fn default() -> Self {
        Self::bundled()
    }
}

/// Renders the PDF report of a scan
///
/// Sections: title, scan information, summary of findings, issues by page.
/// Failed pages are left out. Characters the font has no glyph for are
/// dropped by the PDF writer.
pub fn render_pdf(
    scan_id: &ScanId,
    url: &str,
    results: &[PageResult],
    summary: &ScanSummary,
    generated_at: DateTime<Utc>,
    font: &ReportFont,
) -> Result<Vec<u8>, printpdf::Error> {
    let pages = layout(scan_id, url, results, summary, generated_at);
    let footer = format!("Accessibility Report - {}", scan_id);
    let (width, height) = (Mm::from(Pt(PAGE_WIDTH)), Mm::from(Pt(PAGE_HEIGHT)));

    let (doc, first_page, first_layer) = PdfDocument::new(footer.as_str(), width, height, "Text");
    let typeface = doc.add_external_font(&font.0[..])?;

    for (i, lines) in pages.iter().enumerate() {
        let (page, layer) = if i == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(width, height, "Text")
        };
        let layer = doc.get_page(page).get_layer(layer);

        for line in lines {
            layer.use_text(
                line.text.as_str(),
                line.size,
                Mm::from(Pt(MARGIN)),
                Mm::from(Pt(line.y)),
                &typeface,
            );
        }
        layer.use_text(
            footer.as_str(),
            FOOTER_SIZE,
            Mm::from(Pt(MARGIN)),
            Mm::from(Pt(FOOTER_Y)),
            &typeface,
        );
    }

    doc.save_to_bytes()
}

/// Breaks the report text into pages of positioned lines
fn layout(
    scan_id: &ScanId,
    url: &str,
    results: &[PageResult],
    summary: &ScanSummary,
    generated_at: DateTime<Utc>,
) -> Vec<Vec<TextLine>> {
    let mut doc = Layout::new();

    doc.text("Accessibility Report", TITLE_SIZE);
    doc.gap(BODY_SIZE);

    doc.text("Scan Information", HEADING_SIZE);
    doc.text(&format!("URL: {}", url), BODY_SIZE);
    doc.text(&format!("Scan ID: {}", scan_id), BODY_SIZE);
    doc.text(&format!("Date: {}", generated_at.format("%Y-%m-%d")), BODY_SIZE);
    doc.text(&format!("Pages Scanned: {}", summary.pages_scanned), BODY_SIZE);
    if let Some(score) = summary.accessibility_score {
        doc.text(&format!("Accessibility Score: {}/100", score), BODY_SIZE);
    }
    doc.gap(BODY_SIZE);

    doc.text("Summary of Findings", HEADING_SIZE);
    doc.text(&format!("Total Issues: {}", summary.issues.total), BODY_SIZE);
    doc.text(&format!("Critical Issues: {}", summary.issues.critical), BODY_SIZE);
    doc.text(&format!("Warning Issues: {}", summary.issues.warning), BODY_SIZE);
    doc.text(&format!("Info Issues: {}", summary.issues.info), BODY_SIZE);
    doc.gap(BODY_SIZE);

    doc.text("Issues By Page", HEADING_SIZE);
    for page in results.iter().filter(|p| p.is_success()) {
        doc.gap(DETAIL_SIZE);
        doc.text(&format!("Page: {}", page.url), BODY_SIZE);
        doc.text(
            &format!("Scanned: {}", page.scanned_at.format("%Y-%m-%d %H:%M:%S UTC")),
            BODY_SIZE,
        );
        doc.text(&format!("Issues: {}", page.violation_counts.total), BODY_SIZE);

        if page.violations.is_empty() {
            doc.text("No accessibility issues found on this page.", DETAIL_SIZE + 1.0);
            continue;
        }

        for violation in &page.violations {
            let label = if violation.description.is_empty() {
                &violation.id
            } else {
                &violation.description
            };
            doc.text(
                &format!(
                    "[{}] {} ({} elements)",
                    violation.impact.as_deref().unwrap_or("unknown"),
                    label,
                    violation.nodes.len()
                ),
                DETAIL_SIZE,
            );
        }
    }

    doc.finish()
}

#[derive(Debug, Clone, PartialEq)]
struct TextLine {
    y: f32,
    size: f32,
    text: String,
}

/// Accumulates text lines top-down, breaking pages at the bottom margin
struct Layout {
    pages: Vec<Vec<TextLine>>,
    current: Vec<TextLine>,
    cursor: f32,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Vec::new(),
            cursor: PAGE_HEIGHT - MARGIN,
        }
    }

    /// Adds a paragraph, wrapped to the page width
    fn text(&mut self, text: &str, size: f32) {
        let leading = size * 1.4;
        for line in wrap(text, max_chars(size)) {
            if self.cursor - leading < MARGIN {
                self.break_page();
            }
            self.cursor -= leading;
            self.current.push(TextLine {
                y: self.cursor,
                size,
                text: line,
            });
        }
    }

    fn gap(&mut self, amount: f32) {
        self.cursor -= amount;
        if self.cursor < MARGIN {
            self.break_page();
        }
    }

    fn break_page(&mut self) {
        if !self.current.is_empty() {
            self.pages.push(std::mem::take(&mut self.current));
        }
        self.cursor = PAGE_HEIGHT - MARGIN;
    }

    fn finish(mut self) -> Vec<Vec<TextLine>> {
        self.break_page();
        if self.pages.is_empty() {
            self.pages.push(Vec::new());
        }
        self.pages
    }
}

/// Approximate characters per line; DejaVu Sans averages a bit over half an em
fn max_chars(size: f32) -> usize {
    (((PAGE_WIDTH - 2.0 * MARGIN) / (size * 0.55)) as usize).max(1)
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            lines.push(word.drain(..width).collect());
        }
        let word: String = word.into_iter().collect();

        let needed = if line.is_empty() {
            word.chars().count()
        } else {
            line.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !line.is_empty() {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(&word);
    }

    if !line.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    lines
}

/// PDF renderer writing through an [`ArtifactSink`]
pub struct PdfRenderer {
    sink: Arc<ArtifactSink>,
    font: ReportFont,
}

impl PdfRenderer {
    pub fn new(sink: Arc<ArtifactSink>, font: ReportFont) -> Self {
        Self { sink, font }
    }
}

#[async_trait]
impl ReportRenderer for PdfRenderer {
    fn kind(&self) -> ReportKind {
        ReportKind::Pdf
    }

    async fn render(
        &self,
        scan_id: &ScanId,
        url: &str,
        results: &[PageResult],
        summary: &ScanSummary,
    ) -> ReportResult<ReportRef> {
        let (id, url, results, summary) = (*scan_id, url.to_string(), results.to_vec(), summary.clone());
        let font = self.font.clone();

        let render_error = |message: String| ReportError::Render {
            kind: ReportKind::Pdf,
            message,
        };

        let body = tokio::task::spawn_blocking(move || {
            render_pdf(&id, &url, &results, &summary, Utc::now(), &font)
        })
        .await
        .map_err(|e| render_error(e.to_string()))?
        .map_err(|e| render_error(e.to_string()))?;

        self.sink.store(ReportKind::Pdf, scan_id, body).await
    }
}
