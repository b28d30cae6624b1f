//! HTTP object store
//!
//! Objects are `PUT` to and fetched from `<endpoint>/<key>` and are publicly
//! reachable under `<public-url>/<key>`. Scan records live under
//! `data/<scan-id>.json`.

use crate::config::RemoteStoreConfig;
use crate::scan::{ScanId, ScanRecord};
use crate::storage::traits::{ScanStore, StorageError, StorageResult};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Minimal key/value client for an HTTP object store
#[derive(Debug, Clone)]
pub struct ObjectStore {
    client: Client,
    endpoint: String,
    public_url: String,
    token: Option<String>,
}

impl ObjectStore {
    pub fn new(config: &RemoteStoreConfig) -> StorageResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            public_url: config.public_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.endpoint, key)
    }

    /// Public URL of an object
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_url, key)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Uploads an object, returning its public URL
    pub async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> StorageResult<String> {
        let response = self
            .authorize(self.client.put(self.object_url(key)))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StorageError::Remote(format!(
                "PUT {} returned {}",
                key,
                response.status()
            )));
        }

        Ok(self.public_url(key))
    }

    /// Downloads an object, `None` on 404
    pub async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let response = self
            .authorize(self.client.get(self.object_url(key)))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.bytes().await?.to_vec())),
            status => Err(StorageError::Remote(format!("GET {} returned {}", key, status))),
        }
    }
}

/// Scan records stored as JSON objects
pub struct RemoteScanStore {
    objects: ObjectStore,
}

impl RemoteScanStore {
    pub fn new(objects: ObjectStore) -> Self {
        Self { objects }
    }

    fn key(scan_id: &ScanId) -> String {
        format!("data/{}.json", scan_id)
    }
}

#[async_trait]
impl ScanStore for RemoteScanStore {
    async fn create(&self, record: &ScanRecord) -> StorageResult<()> {
        self.write(record).await
    }

    async fn read(&self, scan_id: &ScanId) -> StorageResult<Option<ScanRecord>> {
        match self.objects.get(&Self::key(scan_id)).await? {
            Some(body) => Ok(Some(serde_json::from_slice(&body)?)),
            None => Ok(None),
        }
    }

    async fn write(&self, record: &ScanRecord) -> StorageResult<()> {
        let body = serde_json::to_vec(record)?;
        self.objects
            .put(&Self::key(&record.scan_id), body, "application/json")
            .await?;
        Ok(())
    }
}
