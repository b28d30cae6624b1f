//! Scans wired from a configuration file, with the object store and the
//! notification webhook served by wiremock

use crate::support::{FakeProvider, FakeSite, ROOT};
use a11y_crawl::config::load_config;
use a11y_crawl::scan::{ScanOptions, ScanRequest, ScanService};
use a11y_crawl::storage::open_store;
use a11y_crawl::ScanStatus;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write_config(dir: &Path, server: &str) -> std::path::PathBuf {
    let engine = dir.join("axe.min.js");
    std::fs::write(&engine, "window.axe = {};").unwrap();

    let config = format!(
        r#"
[scan]
max-pages = 3
settle-delay-ms = 0
navigation-timeout-ms = 5000

[browser]
engine-script = "{engine}"

[storage]
database-path = "{db}"
reports-dir = "{reports}"
reports-base-url = "https://reports.example.com"

[storage.remote]
endpoint = "{server}/store"
public-url = "https://cdn.example.com"
token = "secret"

[notify]
admin-email = "admin@example.com"
error-email = "ops@example.com"
webhook-url = "{server}/hooks/notify"
"#,
        engine = engine.display(),
        db = dir.join("scans.db").display(),
        reports = dir.join("reports").display(),
        server = server,
    );

    let path = dir.join("a11y-crawl.toml");
    std::fs::write(&path, config).unwrap();
    path
}

#[tokio::test]
async fn test_configured_scan_falls_back_to_local_records() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path_regex(r"^/store/data/.+\.json$"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/store/data/.+\.json$"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/store/reports/(pdf|csv)/.+$"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/hooks/notify"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = load_config(&write_config(dir.path(), &server.uri())).unwrap();

    let site = Arc::new(FakeSite::new().link(ROOT, &["/docs", "/blog"]));
    let service = ScanService::from_config(&config, Arc::new(FakeProvider(site))).unwrap();

    let record = service
        .submit(ScanRequest {
            url: ROOT.to_string(),
            email: "owner@example.com".to_string(),
            max_pages: None,
            options: ScanOptions::default(),
        })
        .await
        .unwrap()
        .handle
        .await
        .unwrap()
        .unwrap();

    assert_eq!(record.status, ScanStatus::Completed);
    assert_eq!(record.pages_scanned, 3);

    let reports = record.reports.clone().unwrap();
    assert_eq!(
        reports.pdf,
        format!("https://cdn.example.com/reports/pdf/{}.pdf", record.scan_id)
    );
    assert_eq!(
        reports.csv,
        format!("https://cdn.example.com/reports/csv/{}.csv", record.scan_id)
    );
    assert!(dir
        .path()
        .join("reports/csv")
        .join(format!("{}.csv", record.scan_id))
        .is_file());

    // A fresh store sees the record through the local fallback
    let store = open_store(&config.storage).unwrap();
    let stored = store.read(&record.scan_id).await.unwrap().unwrap();
    assert_eq!(stored.status, ScanStatus::Completed);
    assert_eq!(stored.accessibility_score, Some(100));
    assert!(stored.deep_scan_triggered);

    let requests = server.received_requests().await.unwrap();
    let kinds: Vec<String> = requests
        .iter()
        .filter(|r| r.url.path() == "/hooks/notify")
        .map(|r| {
            let body: Value = serde_json::from_slice(&r.body).unwrap();
            body["kind"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(kinds, vec!["confirmation", "results", "deep-scan-alert"]);
}

#[tokio::test]
async fn test_rejected_notifications_do_not_fail_the_scan() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/hooks/notify"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = load_config(&write_config(dir.path(), &server.uri())).unwrap();

    let service =
        ScanService::from_config(&config, Arc::new(FakeProvider(Arc::new(FakeSite::new()))))
            .unwrap();

    let record = service
        .submit(ScanRequest {
            url: ROOT.to_string(),
            email: "owner@example.com".to_string(),
            max_pages: Some(1),
            options: ScanOptions::default(),
        })
        .await
        .unwrap()
        .handle
        .await
        .unwrap()
        .unwrap();

    assert_eq!(record.status, ScanStatus::Completed);

    // Failed uploads are served from the local reports URL
    assert_eq!(
        record.reports.unwrap().pdf,
        format!(
            "https://reports.example.com/reports/pdf/{}.pdf",
            record.scan_id
        )
    );
}
