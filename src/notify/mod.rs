//! Notification module
//!
//! Scans report their lifecycle through a [`Notifier`]. Message rendering and
//! delivery belong to whatever receives the notification; this module only
//! decides who is told what.

mod webhook;

pub use webhook::WebhookNotifier;

use crate::scan::{IssueCounts, ReportRefs, ScanId, ScanRecord};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Message sent to requesters when their scan fails
///
/// Requesters never see the underlying error.
pub const SANITIZED_ERROR_MESSAGE: &str =
    "We encountered an issue while scanning your website. Our team has been notified and will investigate.";

/// Errors that can occur while delivering a notification
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Failed to deliver notification: {0}")]
    Delivery(String),

    #[error("Notification rejected with status {status}")]
    Rejected { status: u16 },
}

impl From<reqwest::Error> for NotifyError {
    fn from(e: reqwest::Error) -> Self {
        Self::Delivery(e.to_string())
    }
}

/// Kinds of notification a scan can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    Confirmation,
    Results,
    AdminResults,
    DeepScanAlert,
    Error,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Confirmation => "confirmation",
            Self::Results => "results",
            Self::AdminResults => "admin-results",
            Self::DeepScanAlert => "deep-scan-alert",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Data carried by a notification
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub scan_id: String,
    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub requester: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages_scanned: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues: Option<IssueCounts>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub accessibility_score: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reports: Option<ReportRefs>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl NotificationPayload {
    fn for_scan(scan_id: &ScanId, url: &str) -> Self {
        Self {
            scan_id: scan_id.to_string(),
            url: url.to_string(),
            ..Self::default()
        }
    }

    fn with_results(record: &ScanRecord) -> Self {
        Self {
            pages_scanned: Some(record.pages_scanned),
            issues: Some(record.issues),
            accessibility_score: record.accessibility_score,
            reports: record.reports.clone(),
            ..Self::for_scan(&record.scan_id, &record.url)
        }
    }
}

/// One notification addressed to one recipient
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub recipient: String,
    pub subject: String,
    pub payload: NotificationPayload,
}

impl Notification {
    /// Scan accepted and queued
    pub fn confirmation(record: &ScanRecord) -> Self {
        Self {
            kind: NotificationKind::Confirmation,
            recipient: record.requester.clone(),
            subject: "Your Accessibility Scan Has Started".to_string(),
            payload: NotificationPayload::for_scan(&record.scan_id, &record.url),
        }
    }

    /// Finished results for the requester
    pub fn results(record: &ScanRecord) -> Self {
        Self {
            kind: NotificationKind::Results,
            recipient: record.requester.clone(),
            subject: "Your Accessibility Report is Ready".to_string(),
            payload: NotificationPayload::with_results(record),
        }
    }

    /// Copy of the finished results for the admin
    pub fn admin_results(admin: &str, record: &ScanRecord) -> Self {
        Self {
            kind: NotificationKind::AdminResults,
            recipient: admin.to_string(),
            subject: format!("[ADMIN] New Scan Results for {}", record.url),
            payload: NotificationPayload {
                requester: Some(record.requester.clone()),
                ..NotificationPayload::with_results(record)
            },
        }
    }

    /// A site scored high enough to be worth a deep scan
    pub fn deep_scan_alert(admin: &str, record: &ScanRecord, score: u8) -> Self {
        Self {
            kind: NotificationKind::DeepScanAlert,
            recipient: admin.to_string(),
            subject: format!("[ALERT] High Scoring Site ({}/100) - Deep Scan Candidate", score),
            payload: NotificationPayload {
                requester: Some(record.requester.clone()),
                ..NotificationPayload::with_results(record)
            },
        }
    }

    /// Full failure detail for the operations address
    pub fn operational_error(recipient: &str, record: &ScanRecord, detail: &str) -> Self {
        Self {
            kind: NotificationKind::Error,
            recipient: recipient.to_string(),
            subject: format!("[ERROR] Scan {} failed for {}", record.scan_id, record.url),
            payload: NotificationPayload {
                requester: Some(record.requester.clone()),
                message: Some(detail.to_string()),
                ..NotificationPayload::with_results(record)
            },
        }
    }

    /// Sanitized failure notice for the requester
    pub fn requester_error(record: &ScanRecord) -> Self {
        Self {
            kind: NotificationKind::Error,
            recipient: record.requester.clone(),
            subject: "Issue with Your Accessibility Scan".to_string(),
            payload: NotificationPayload {
                message: Some(SANITIZED_ERROR_MESSAGE.to_string()),
                ..NotificationPayload::for_scan(&record.scan_id, &record.url)
            },
        }
    }
}

/// Delivers notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Notifier that only writes notifications to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            kind = %notification.kind,
            recipient = %notification.recipient,
            scan_id = %notification.payload.scan_id,
            "{}",
            notification.subject
        );
        Ok(())
    }
}

/// Builds the notifier described by the configuration
///
/// Notifications go to the webhook when one is configured and to the log
/// otherwise.
pub fn open_notifier(config: &crate::config::NotifyConfig) -> Result<Arc<dyn Notifier>, NotifyError> {
    match &config.webhook_url {
        Some(url) => {
            tracing::info!("Delivering notifications to {}", url);
            Ok(Arc::new(WebhookNotifier::new(url.clone())?))
        }
        None => Ok(Arc::new(LogNotifier)),
    }
}
