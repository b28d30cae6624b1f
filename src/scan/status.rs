/// Scan status definitions for tracking the lifecycle of a scan
///
/// This module defines the four states a scan record moves through and the
/// transitions allowed between them.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the current state of a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    // ===== Active States =====
    /// Scan has been requested and persisted but not started
    Pending,

    /// Scan is crawling, scoring or generating reports
    Running,

    // ===== Terminal States =====
    /// Crawl, scoring and reports all succeeded
    Completed,

    /// A scan-level failure aborted the scan
    Failed,
}

impl ScanStatus {
    /// Returns true if no further transition is allowed
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if the scan is still in progress
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }

    /// Returns true if `next` is a legal successor of this status
    ///
    /// ```text
    /// pending -> running -> completed
    ///                    \-> failed
    /// ```
    pub fn can_transition_to(&self, next: ScanStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }

    /// Converts the status to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Returns all possible scan statuses
    pub fn all_statuses() -> Vec<Self> {
        vec![Self::Pending, Self::Running, Self::Completed, Self::Failed]
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
