//! End-to-end scans driven through `ScanService` against a fake site

use crate::support::{deps, failing_csv_reports, real_reports, violation, FakeSite, Outbox, ROOT};
use a11y_crawl::notify::SANITIZED_ERROR_MESSAGE;
use a11y_crawl::report::{ReportError, ReportKind};
use a11y_crawl::scan::{IssueCounts, PageResult, ScanOptions, ScanRequest, ScanService};
use a11y_crawl::{A11yError, ScanError, ScanRecord, ScanStatus};
use serde_json::json;
use std::sync::Arc;

fn request(max_pages: u32) -> ScanRequest {
    ScanRequest {
        url: ROOT.to_string(),
        email: "owner@example.com".to_string(),
        max_pages: Some(max_pages),
        options: ScanOptions::default(),
    }
}

/// Totals recomputed from the audited pages of a record
fn summed_issues(record: &ScanRecord) -> IssueCounts {
    let mut issues = IssueCounts::default();
    for page in record.results.iter().filter(|page| page.is_success()) {
        issues += page.violation_counts;
    }
    issues
}

#[tokio::test]
async fn test_budget_limits_pages_and_skips_last_discovery() {
    let pages: Vec<String> = (1..=10).map(|i| format!("/p{}", i)).collect();
    let hrefs: Vec<&str> = pages.iter().map(String::as_str).collect();
    let site = Arc::new(
        FakeSite::new()
            .link(ROOT, &hrefs)
            .violations(
                ROOT,
                json!([
                    violation("image-alt", "serious", 1),
                    violation("button-name", "critical", 1),
                    violation("color-contrast", "moderate", 1)
                ]),
            ),
    );
    let outbox = Arc::new(Outbox::default());
    let dir = tempfile::tempdir().unwrap();
    let service = ScanService::new(deps(site.clone(), outbox.clone(), real_reports(dir.path())));

    let submitted = service.submit(request(5)).await.unwrap();
    let record = submitted.handle.await.unwrap().unwrap();

    assert_eq!(record.status, ScanStatus::Completed);
    assert_eq!(record.pages_scanned, 5);
    assert_eq!(record.pages_found, 11);
    assert_eq!(
        site.navigated(),
        vec![
            "https://example.com/",
            "https://example.com/p1",
            "https://example.com/p2",
            "https://example.com/p3",
            "https://example.com/p4",
        ]
    );

    // The fifth page is the last one the budget allows
    assert_eq!(site.link_requests().len(), 4);
    assert!(!site
        .link_requests()
        .contains(&"https://example.com/p4".to_string()));
    assert!(record.results[4].links.is_empty());

    assert_eq!(record.issues.total, 3);
    assert_eq!(record.issues.critical, 2);
    assert_eq!(record.issues.warning, 1);
    assert_eq!(summed_issues(&record), record.issues);
    assert_eq!(record.accessibility_score, Some(89));
    assert!(!record.deep_scan_triggered);

    let reports = record.reports.clone().unwrap();
    assert_eq!(
        reports.pdf,
        format!("https://scans.example.com/reports/pdf/{}.pdf", record.scan_id)
    );
    assert!(dir
        .path()
        .join("pdf")
        .join(format!("{}.pdf", record.scan_id))
        .is_file());
    let csv = std::fs::read_to_string(
        dir.path()
            .join("csv")
            .join(format!("{}.csv", record.scan_id)),
    )
    .unwrap();
    assert_eq!(csv.lines().count(), 4);

    assert_eq!(outbox.kinds(), vec!["confirmation", "results"]);
    assert_eq!(site.open_pages(), 0);
    assert_eq!(site.sessions_closed(), 1);

    let stored = service.details(&record.scan_id).await.unwrap();
    assert_eq!(stored, record);
}

#[tokio::test]
async fn test_navigation_timeout_is_a_page_failure() {
    let site = Arc::new(
        FakeSite::new()
            .link(ROOT, &["/a", "/b", "/c"])
            .status("https://example.com/a", 404)
            .violations(
                "https://example.com/a",
                json!([violation("image-alt", "critical", 2)]),
            )
            .hang("https://example.com/b")
            .violations(
                "https://example.com/c",
                json!([violation("region", "minor", 1)]),
            ),
    );
    let outbox = Arc::new(Outbox::default());
    let dir = tempfile::tempdir().unwrap();
    let service = ScanService::new(deps(site.clone(), outbox, real_reports(dir.path())));

    let record = service
        .submit(request(5))
        .await
        .unwrap()
        .handle
        .await
        .unwrap()
        .unwrap();

    assert_eq!(record.status, ScanStatus::Completed);
    assert_eq!(record.pages_scanned, 4);

    // A 404 document is still audited
    assert_eq!(record.results[1].status, 404);
    assert!(record.results[1].is_success());

    let failed = &record.results[2];
    assert_eq!(failed.url, "https://example.com/b");
    assert_eq!(failed.status, PageResult::STATUS_FAILED);
    assert!(failed.error.as_ref().unwrap().contains("timed out"));
    assert_eq!(failed.violation_counts.total, 0);

    assert_eq!(record.results[3].url, "https://example.com/c");
    assert!(record.results[3].is_success());

    assert_eq!(record.issues.total, 3);
    assert_eq!(summed_issues(&record), record.issues);
    assert_eq!(site.open_pages(), 0);
}

#[tokio::test]
async fn test_report_failure_fails_scan_and_keeps_partial_results() {
    let site = Arc::new(
        FakeSite::new()
            .link(ROOT, &["/a"])
            .violations(ROOT, json!([violation("label", "minor", 2)])),
    );
    let outbox = Arc::new(Outbox::default());
    let dir = tempfile::tempdir().unwrap();
    let service = ScanService::new(deps(site, outbox.clone(), failing_csv_reports(dir.path())));

    let submitted = service.submit(request(5)).await.unwrap();
    let scan_id = submitted.scan_id;
    let err = submitted.handle.await.unwrap().unwrap_err();

    match err {
        ScanError::Report(ReportError::Failed { failed, .. }) => {
            assert_eq!(failed, vec![ReportKind::Csv]);
        }
        other => panic!("unexpected error: {}", other),
    }

    let stored = service.details(&scan_id).await.unwrap();
    assert_eq!(stored.status, ScanStatus::Failed);
    assert!(stored.completed_at.is_some());
    assert!(stored.reports.is_none());
    assert!(stored.accessibility_score.is_none());
    assert!(!stored.deep_scan_triggered);
    assert_eq!(stored.pages_scanned, 2);
    assert_eq!(stored.issues.warning, 2);
    assert_eq!(summed_issues(&stored), stored.issues);

    let sent = outbox.sent();
    assert_eq!(outbox.kinds(), vec!["confirmation", "error", "error"]);
    assert_eq!(sent[1].recipient, "ops@example.com");
    assert!(sent[1].payload.message.as_deref().unwrap().contains("csv"));
    assert_eq!(sent[2].recipient, "owner@example.com");
    assert_eq!(
        sent[2].payload.message.as_deref(),
        Some(SANITIZED_ERROR_MESSAGE)
    );
}

#[tokio::test]
async fn test_clean_site_triggers_deep_scan_alert() {
    let site = Arc::new(FakeSite::new().link(ROOT, &["/about"]));
    let outbox = Arc::new(Outbox::default());
    let dir = tempfile::tempdir().unwrap();
    let service = ScanService::new(deps(site, outbox.clone(), real_reports(dir.path())));

    let mut request = request(5);
    request.options = ScanOptions {
        send_copy_to_admin: true,
        admin_email: Some("lead@example.com".to_string()),
    };
    let record = service
        .submit(request)
        .await
        .unwrap()
        .handle
        .await
        .unwrap()
        .unwrap();

    assert_eq!(record.accessibility_score, Some(100));
    assert!(record.deep_scan_triggered);

    let stored = service.details(&record.scan_id).await.unwrap();
    assert!(stored.deep_scan_triggered);

    assert_eq!(
        outbox.kinds(),
        vec!["confirmation", "results", "admin-results", "deep-scan-alert"]
    );
    let sent = outbox.sent();
    assert_eq!(sent[2].recipient, "lead@example.com");
    assert_eq!(sent[3].recipient, "lead@example.com");
    assert_eq!(
        sent[3].subject,
        "[ALERT] High Scoring Site (100/100) - Deep Scan Candidate"
    );
}

#[tokio::test]
async fn test_links_are_filtered_and_deduplicated() {
    let site = Arc::new(
        FakeSite::new()
            .link(
                ROOT,
                &[
                    "/a",
                    "/a#top",
                    "https://example.com/a",
                    "/a?",
                    "#main",
                    "https://other.com/x",
                    "mailto:someone@example.com",
                ],
            )
            .link("https://example.com/a", &["/", "/#footer"]),
    );
    let outbox = Arc::new(Outbox::default());
    let dir = tempfile::tempdir().unwrap();
    let service = ScanService::new(deps(site.clone(), outbox, real_reports(dir.path())));

    let record = service
        .submit(request(5))
        .await
        .unwrap()
        .handle
        .await
        .unwrap()
        .unwrap();

    assert_eq!(record.pages_scanned, 2);
    assert_eq!(record.pages_found, 2);
    assert_eq!(record.results[0].links, vec!["https://example.com/a"]);
    assert_eq!(
        site.navigated(),
        vec!["https://example.com/", "https://example.com/a"]
    );
}

#[tokio::test]
async fn test_status_reports_progress_without_results() {
    let site = Arc::new(FakeSite::new());
    let outbox = Arc::new(Outbox::default());
    let dir = tempfile::tempdir().unwrap();
    let service = ScanService::new(deps(site, outbox, real_reports(dir.path())));

    let submitted = service.submit(request(1)).await.unwrap();
    let scan_id = submitted.scan_id;
    submitted.handle.await.unwrap().unwrap();

    let progress = service.status(&scan_id).await.unwrap();
    assert_eq!(progress.status, ScanStatus::Completed);
    assert_eq!(progress.pages_scanned, 1);
    assert!(progress.reports.is_some());

    let json = serde_json::to_value(&progress).unwrap();
    assert!(json.get("results").is_none());
    assert_eq!(json["status"], "completed");
}

#[tokio::test]
async fn test_invalid_requests_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let outbox = Arc::new(Outbox::default());
    let service = ScanService::new(deps(
        Arc::new(FakeSite::new()),
        outbox.clone(),
        real_reports(dir.path()),
    ));

    let mut bad_url = request(5);
    bad_url.url = "ftp://example.com/".to_string();
    assert!(matches!(
        service.submit(bad_url).await,
        Err(A11yError::Url(_))
    ));

    let mut bad_email = request(5);
    bad_email.email = "not-an-email".to_string();
    assert!(matches!(
        service.submit(bad_email).await,
        Err(A11yError::InvalidRequest(_))
    ));

    assert!(matches!(
        service.submit(request(501)).await,
        Err(A11yError::InvalidRequest(_))
    ));

    assert!(outbox.sent().is_empty());
}

#[tokio::test]
async fn test_unknown_scan_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let service = ScanService::new(deps(
        Arc::new(FakeSite::new()),
        Arc::new(Outbox::default()),
        real_reports(dir.path()),
    ));

    let err = service
        .status(&a11y_crawl::ScanId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::NotFound(_)));
}
