//! Scan records, scoring and the scan lifecycle
//!
//! This module contains:
//! - The persisted scan record and the page results it accumulates
//! - The status enum and its allowed transitions
//! - The accessibility score calculation
//! - The task that drives one scan from pending to completed or failed
//! - The service used to submit and look up scans

mod machine;
mod record;
mod score;
mod service;
mod status;

pub use machine::{run_scan, start_scan, ScanDeps, ScanSettings};
pub use record::{
    IssueCounts, PageResult, ReportRefs, ScanId, ScanOptions, ScanPatch, ScanRecord, Severity,
    Violation, ViolationNode,
};
pub use score::accessibility_score;
pub use service::{ScanProgress, ScanRequest, ScanService, SubmittedScan};
pub use status::ScanStatus;
