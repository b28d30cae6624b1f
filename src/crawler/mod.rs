//! Crawler module for auditing a bounded slice of a site
//!
//! This module contains the core crawling logic, including:
//! - Breadth-first traversal state with a page budget
//! - Accessibility audits of live pages
//! - Same-host link discovery
//! - Overall crawl coordination with one browser session per crawl

mod coordinator;
mod executor;
mod frontier;
mod links;

pub use coordinator::{Coordinator, CrawlSettings};
pub use executor::{PageAudit, PageTester};
pub use frontier::CrawlContext;
pub use links::extract_links;
