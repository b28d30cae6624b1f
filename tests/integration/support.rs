//! Shared fakes for the integration tests
//!
//! `FakeSite` stands in for a real website rendered by a headless browser:
//! every page has a list of hrefs and a list of violations, and individual
//! pages can be made to hang during navigation.

use a11y_crawl::browser::{BrowserError, BrowserProvider, BrowserSession, PageHandle, PageOptions};
use a11y_crawl::crawler::{Coordinator, CrawlSettings, PageTester};
use a11y_crawl::notify::{Notification, Notifier, NotifyError};
use a11y_crawl::report::{
    ArtifactSink, PdfRenderer, ReportCoordinator, ReportError, ReportFont, ReportKind, ReportRef,
    ReportRenderer, ReportResult, ScanSummary,
};
use a11y_crawl::scan::{PageResult, ScanDeps, ScanId, ScanSettings};
use a11y_crawl::storage::SqliteScanStore;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const ROOT: &str = "https://example.com/";

#[derive(Default)]
pub struct FakeSite {
    hrefs: HashMap<String, Vec<String>>,
    violations: HashMap<String, Value>,
    hanging: HashSet<String>,
    statuses: HashMap<String, u16>,
    navigated: Mutex<Vec<String>>,
    link_requests: Mutex<Vec<String>>,
    open_pages: AtomicUsize,
    sessions_closed: AtomicUsize,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds anchors to a page
    pub fn link(mut self, page: &str, hrefs: &[&str]) -> Self {
        self.hrefs
            .entry(page.to_string())
            .or_default()
            .extend(hrefs.iter().map(|h| h.to_string()));
        self
    }

    /// Sets the violations reported on a page
    pub fn violations(mut self, page: &str, violations: Value) -> Self {
        self.violations.insert(page.to_string(), violations);
        self
    }

    /// Serves a page's document with an HTTP status other than 200
    pub fn status(mut self, page: &str, status: u16) -> Self {
        self.statuses.insert(page.to_string(), status);
        self
    }

    /// Makes navigation to a page never finish
    pub fn hang(mut self, page: &str) -> Self {
        self.hanging.insert(page.to_string());
        self
    }

    pub fn navigated(&self) -> Vec<String> {
        self.navigated.lock().unwrap().clone()
    }

    pub fn link_requests(&self) -> Vec<String> {
        self.link_requests.lock().unwrap().clone()
    }

    pub fn open_pages(&self) -> usize {
        self.open_pages.load(Ordering::SeqCst)
    }

    pub fn sessions_closed(&self) -> usize {
        self.sessions_closed.load(Ordering::SeqCst)
    }
}

pub struct FakeProvider(pub Arc<FakeSite>);

struct FakeSession(Arc<FakeSite>);

struct FakePage {
    site: Arc<FakeSite>,
    location: Mutex<String>,
}

#[async_trait]
impl BrowserProvider for FakeProvider {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        Ok(Box::new(FakeSession(self.0.clone())))
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn open_page(&self, _options: &PageOptions) -> Result<Box<dyn PageHandle>, BrowserError> {
        self.0.open_pages.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePage {
            site: self.0.clone(),
            location: Mutex::new(String::new()),
        }))
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        self.0.sessions_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl PageHandle for FakePage {
    async fn navigate(&self, url: &str) -> Result<Option<u16>, BrowserError> {
        self.site.navigated.lock().unwrap().push(url.to_string());
        if self.site.hanging.contains(url) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        *self.location.lock().unwrap() = url.to_string();
        Ok(self.site.statuses.get(url).copied())
    }

    async fn evaluate(&self, expression: &str) -> Result<Value, BrowserError> {
        let location = self.location.lock().unwrap().clone();

        if expression.contains("querySelectorAll") {
            self.site.link_requests.lock().unwrap().push(location.clone());
            let hrefs = self.site.hrefs.get(&location).cloned().unwrap_or_default();
            return Ok(json!({ "location": location, "hrefs": hrefs }));
        }

        if expression.contains("axe.run") {
            let violations = self
                .site
                .violations
                .get(&location)
                .cloned()
                .unwrap_or_else(|| json!([]));
            return Ok(json!({ "violations": violations }));
        }

        // Engine injection
        Ok(Value::Null)
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        self.site.open_pages.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A single violation of the given impact touching `nodes` elements
pub fn violation(id: &str, impact: &str, nodes: usize) -> Value {
    let nodes: Vec<Value> = (0..nodes)
        .map(|i| json!({ "target": [format!("#el-{}", i)], "html": "<div></div>" }))
        .collect();
    json!({
        "id": id,
        "description": format!("{} description", id),
        "help": format!("Fix {}", id),
        "helpUrl": format!("https://rules.example/{}", id),
        "impact": impact,
        "nodes": nodes,
        "tags": ["wcag2a", "wcag111"]
    })
}

/// Collects every notification in memory
#[derive(Default)]
pub struct Outbox(Mutex<Vec<Notification>>);

impl Outbox {
    pub fn sent(&self) -> Vec<Notification> {
        self.0.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<String> {
        self.sent().iter().map(|n| n.kind.to_string()).collect()
    }
}

#[async_trait]
impl Notifier for Outbox {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.0.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Renderer that always fails
pub struct BrokenRenderer(pub ReportKind);

#[async_trait]
impl ReportRenderer for BrokenRenderer {
    fn kind(&self) -> ReportKind {
        self.0
    }

    async fn render(
        &self,
        _scan_id: &ScanId,
        _url: &str,
        _results: &[PageResult],
        _summary: &ScanSummary,
    ) -> ReportResult<ReportRef> {
        Err(ReportError::Render {
            kind: self.0,
            message: "disk full".to_string(),
        })
    }
}

pub fn crawl_settings(max_pages: u32) -> CrawlSettings {
    CrawlSettings {
        max_pages,
        navigation_timeout: Duration::from_millis(200),
        settle_delay: Duration::ZERO,
        page: PageOptions {
            viewport_width: 1280,
            viewport_height: 800,
            user_agent: "a11y-crawl-test".to_string(),
        },
    }
}

pub fn scan_settings(max_pages: u32) -> ScanSettings {
    ScanSettings {
        crawl: crawl_settings(max_pages),
        deep_scan_threshold: 90,
        admin_email: "admin@example.com".to_string(),
        error_email: "ops@example.com".to_string(),
    }
}

/// Real PDF and CSV renderers writing below `dir`
pub fn real_reports(dir: &Path) -> ReportCoordinator {
    ReportCoordinator::with_sink(
        ArtifactSink::new(dir, "https://scans.example.com", None),
        ReportFont::bundled(),
    )
}

/// Real PDF renderer with a CSV renderer that always fails
pub fn failing_csv_reports(dir: &Path) -> ReportCoordinator {
    let sink = Arc::new(ArtifactSink::new(dir, "https://scans.example.com", None));
    ReportCoordinator::new(
        Arc::new(PdfRenderer::new(sink, ReportFont::bundled())),
        Arc::new(BrokenRenderer(ReportKind::Csv)),
    )
}

pub fn deps(site: Arc<FakeSite>, outbox: Arc<Outbox>, reports: ReportCoordinator) -> ScanDeps {
    ScanDeps {
        store: Arc::new(SqliteScanStore::new_in_memory().unwrap()),
        notifier: outbox,
        crawler: Arc::new(Coordinator::new(
            Arc::new(FakeProvider(site)),
            PageTester::new(
                "window.axe = {};",
                vec!["wcag2a".to_string(), "wcag2aa".to_string()],
                Duration::from_secs(5),
            ),
        )),
        reports: Arc::new(reports),
        settings: Arc::new(scan_settings(5)),
    }
}
