//! Breadth-first traversal state of one crawl
//!
//! The context is created and owned by the caller so that whatever the
//! crawl accumulated is still available when it aborts.

use crate::scan::{IssueCounts, PageResult};
use crate::url::page_key;
use std::collections::{HashSet, VecDeque};
use url::Url;

/// Caller-owned state of a single crawl
#[derive(Debug, Default)]
pub struct CrawlContext {
    /// FIFO of URLs waiting to be audited
    queue: VecDeque<String>,

    /// URLs that have been dequeued and processed (successfully or not)
    visited: HashSet<String>,

    /// Every URL ever enqueued, including the root
    discovered: HashSet<String>,

    /// Page results in visit order
    pub results: Vec<PageResult>,

    /// Running totals over `results`
    pub issues: IssueCounts,

    pub pages_scanned: u32,
}

impl CrawlContext {
    /// Creates a context seeded with the root URL
    pub fn new(root: impl Into<String>) -> Self {
        let root = root.into();
        let mut context = Self::default();
        context.discovered.insert(root.clone());
        context.queue.push_back(root);
        context
    }

    /// Creates a context seeded with the crawl key of a root URL
    pub fn for_root(root: &Url) -> Self {
        Self::new(page_key(root))
    }

    /// Pops the next URL that has not been visited yet
    ///
    /// Already-visited entries are discarded without consuming budget.
    pub fn next_unvisited(&mut self) -> Option<String> {
        while let Some(url) = self.queue.pop_front() {
            if !self.visited.contains(&url) {
                return Some(url);
            }
            tracing::trace!("Skipping already visited {}", url);
        }
        None
    }

    pub fn mark_visited(&mut self, url: &str) {
        self.visited.insert(url.to_string());
    }

    /// Enqueues links not seen before, returning how many were new
    pub fn enqueue_links<'a, I>(&mut self, links: I) -> usize
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut added = 0;
        for link in links {
            if self.discovered.insert(link.clone()) {
                self.queue.push_back(link.clone());
                added += 1;
            }
        }
        added
    }

    /// Appends a page result and folds its counts into the totals
    pub fn record(&mut self, result: PageResult) {
        self.issues += result.violation_counts;
        self.pages_scanned += 1;
        self.results.push(result);
    }

    pub fn pages_found(&self) -> u32 {
        self.discovered.len() as u32
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }
}
