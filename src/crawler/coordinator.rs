//! Crawler coordinator - bounded breadth-first crawl of one site
//!
//! This module contains the crawl loop that:
//! - Launches one browser session per crawl and always releases it
//! - Visits queued URLs in FIFO order, one page at a time
//! - Audits each page and discovers its same-host links
//! - Isolates per-page failures as failed page results

use crate::browser::{BrowserProvider, BrowserSession, PageHandle, PageOptions, SessionGuard};
use crate::crawler::executor::PageTester;
use crate::crawler::frontier::CrawlContext;
use crate::crawler::links::extract_links;
use crate::scan::PageResult;
use crate::{PageError, ScanError};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Per-crawl limits and page settings
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Page budget; values below 1 are treated as 1
    pub max_pages: u32,
    pub navigation_timeout: Duration,
    pub settle_delay: Duration,
    pub page: PageOptions,
}

impl CrawlSettings {
    /// Builds crawl settings from configuration with a per-scan page budget
    pub fn from_config(config: &crate::config::Config, max_pages: u32) -> Self {
        Self {
            max_pages,
            navigation_timeout: config.scan.navigation_timeout(),
            settle_delay: config.scan.settle_delay(),
            page: PageOptions::from(&config.browser),
        }
    }

    /// Effective page budget
    pub fn budget(&self) -> u32 {
        self.max_pages.max(1)
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    provider: Arc<dyn BrowserProvider>,
    tester: PageTester,
}

impl Coordinator {
    pub fn new(provider: Arc<dyn BrowserProvider>, tester: PageTester) -> Self {
        Self { provider, tester }
    }

    /// Crawls from the root seeded in `context`
    ///
    /// Results accumulate in `context` as pages are visited, so they survive
    /// a scan-level failure. The loop stops when the queue is empty or the
    /// page budget is used up; `pages_found` is the size of the discovered
    /// set at that point.
    ///
    /// # Arguments
    ///
    /// * `context` - Traversal state, usually `CrawlContext::for_root(root)`
    /// * `root` - The root URL of the scan; only its hostname may be crawled
    /// * `settings` - Budget, timeouts and page options
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Crawl finished
    /// * `Err(ScanError)` - The browser could not be launched or the session broke
    pub async fn crawl(
        &self,
        context: &mut CrawlContext,
        root: &Url,
        settings: &CrawlSettings,
    ) -> Result<(), ScanError> {
        tracing::info!("Starting crawl of {} (budget {})", root, settings.budget());

        let session = self.provider.launch().await.map_err(ScanError::Launch)?;
        let guard = SessionGuard::new(session);

        let result = self.run(&guard, context, root, settings).await;

        if let Err(e) = guard.release().await {
            tracing::warn!("Failed to close browser session: {}", e);
        }

        tracing::info!(
            "Crawl of {} finished: {} pages scanned, {} found",
            root,
            context.pages_scanned,
            context.pages_found()
        );

        result
    }

    async fn run(
        &self,
        guard: &SessionGuard,
        context: &mut CrawlContext,
        root: &Url,
        settings: &CrawlSettings,
    ) -> Result<(), ScanError> {
        let session = guard.session()?;
        let budget = settings.budget();

        while context.pages_scanned < budget {
            let Some(url) = context.next_unvisited() else {
                tracing::debug!("Queue is empty, crawl complete");
                break;
            };

            context.mark_visited(&url);

            // The last page of the budget never needs its links
            let discover = context.pages_scanned + 1 < budget;

            tracing::debug!(
                "Processing page {}/{}: {} ({} queued)",
                context.pages_scanned + 1,
                budget,
                url,
                context.queued()
            );

            let result = match self.visit(session, &url, root, settings, discover).await {
                Ok(result) => {
                    let added = context.enqueue_links(&result.links);
                    tracing::debug!(
                        "{}: {} violations, {} new links",
                        url,
                        result.violation_counts.total,
                        added
                    );
                    result
                }
                Err(e) => {
                    tracing::warn!("Page {} failed: {}", url, e);
                    PageResult::failure(&url, &e)
                }
            };

            context.record(result);
        }

        Ok(())
    }

    /// Opens a page, audits `url` in it and closes it again
    async fn visit(
        &self,
        session: &dyn BrowserSession,
        url: &str,
        root: &Url,
        settings: &CrawlSettings,
        discover: bool,
    ) -> Result<PageResult, PageError> {
        let mut page = session
            .open_page(&settings.page)
            .await
            .map_err(PageError::Open)?;

        let result = self
            .audit(page.as_ref(), url, root, settings, discover)
            .await;

        if let Err(e) = page.close().await {
            tracing::warn!("Failed to close page {}: {}", url, e);
        }

        result
    }

    async fn audit(
        &self,
        page: &dyn PageHandle,
        url: &str,
        root: &Url,
        settings: &CrawlSettings,
        discover: bool,
    ) -> Result<PageResult, PageError> {
        let timeout = settings.navigation_timeout;
        let status = tokio::time::timeout(timeout, page.navigate(url))
            .await
            .map_err(|_| PageError::NavigationTimeout {
                url: url.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            })?
            .map_err(|e| PageError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        tokio::time::sleep(settings.settle_delay).await;

        let audit = self.tester.test(page).await?;

        let links = if discover {
            extract_links(page, root).await
        } else {
            Vec::new()
        };

        Ok(PageResult::success(url, audit.violations, links)
            .with_status(status.unwrap_or(PageResult::STATUS_OK)))
    }
}
