//! Object store, remote scan store and webhook notifier against wiremock

use a11y_crawl::config::RemoteStoreConfig;
use a11y_crawl::notify::{Notification, Notifier, NotifyError, WebhookNotifier};
use a11y_crawl::scan::{ScanId, ScanOptions, ScanRecord};
use a11y_crawl::storage::{ObjectStore, RemoteScanStore, ScanStore, StorageError};
use serde_json::Value;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn object_store(server: &MockServer) -> ObjectStore {
    ObjectStore::new(&RemoteStoreConfig {
        endpoint: format!("{}/bucket/", server.uri()),
        public_url: "https://cdn.example.com/".to_string(),
        token: Some("secret".to_string()),
    })
    .unwrap()
}

fn record() -> ScanRecord {
    ScanRecord::new(
        ScanId::new(),
        "https://example.com/",
        "owner@example.com",
        90,
        ScanOptions::default(),
    )
}

#[tokio::test]
async fn test_put_sends_token_and_returns_public_url() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/bucket/reports/csv/x.csv"))
        .and(header("authorization", "Bearer secret"))
        .and(header("content-type", "text/csv"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let url = object_store(&server)
        .put("reports/csv/x.csv", b"a,b\r\n".to_vec(), "text/csv")
        .await
        .unwrap();
    assert_eq!(url, "https://cdn.example.com/reports/csv/x.csv");
}

#[tokio::test]
async fn test_put_rejection_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = object_store(&server)
        .put("reports/pdf/x.pdf", Vec::new(), "application/pdf")
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Remote(_)));
}

#[tokio::test]
async fn test_remote_store_round_trips_records() {
    let server = MockServer::start().await;
    let record = record();
    let key = format!("/bucket/data/{}.json", record.scan_id);

    Mock::given(method("PUT"))
        .and(path(key.as_str()))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(key.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(&record))
        .mount(&server)
        .await;

    let store = RemoteScanStore::new(object_store(&server));
    store.write(&record).await.unwrap();

    let read = store.read(&record.scan_id).await.unwrap().unwrap();
    assert_eq!(read, record);
}

#[tokio::test]
async fn test_remote_store_missing_record_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let store = RemoteScanStore::new(object_store(&server));
    assert!(store.read(&ScanId::new()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_remote_store_corrupt_record_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&server)
        .await;

    let store = RemoteScanStore::new(object_store(&server));
    let err = store.read(&ScanId::new()).await.unwrap_err();
    assert!(matches!(err, StorageError::Serialization(_)));
}

#[tokio::test]
async fn test_webhook_posts_notification_json() {
    let server = MockServer::start().await;
    let record = record();
    let notification = Notification::confirmation(&record);

    Mock::given(method("POST"))
        .and(path("/notify"))
        .and(body_json(serde_json::to_value(&notification).unwrap()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = WebhookNotifier::new(format!("{}/notify", server.uri())).unwrap();
    notifier.notify(&notification).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["recipient"], "owner@example.com");
    assert_eq!(body["payload"]["scanId"], record.scan_id.to_string());
}

#[tokio::test]
async fn test_webhook_rejection_carries_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let notifier = WebhookNotifier::new(format!("{}/notify", server.uri())).unwrap();
    let err = notifier
        .notify(&Notification::requester_error(&record()))
        .await
        .unwrap_err();
    assert!(matches!(err, NotifyError::Rejected { status: 502 }));
}
