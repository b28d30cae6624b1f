//! Storage traits and error types
//!
//! This module defines the trait interface for scan record backends and
//! associated error types.

use crate::scan::{ScanId, ScanPatch, ScanRecord};
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Scan not found: {0}")]
    NotFound(String),

    #[error("Scan already exists: {0}")]
    AlreadyExists(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Remote store error: {0}")]
    Remote(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl From<reqwest::Error> for StorageError {
    fn from(e: reqwest::Error) -> Self {
        Self::Remote(e.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for scan record backends
///
/// Implementations must be safe to share between concurrently running
/// scans; each scan only ever writes its own record.
#[async_trait]
pub trait ScanStore: Send + Sync {
    /// Persists a new record
    ///
    /// # Errors
    ///
    /// Backends that can detect it return [`StorageError::AlreadyExists`]
    /// when the scan id is taken.
    async fn create(&self, record: &ScanRecord) -> StorageResult<()>;

    /// Reads a record, `None` if it does not exist
    async fn read(&self, scan_id: &ScanId) -> StorageResult<Option<ScanRecord>>;

    /// Replaces a stored record with `record`
    async fn write(&self, record: &ScanRecord) -> StorageResult<()>;

    /// Merges a partial update into a stored record
    ///
    /// # Returns
    ///
    /// The record as written
    ///
    /// # Errors
    ///
    /// [`StorageError::NotFound`] if there is no record for `scan_id`
    async fn update(&self, scan_id: &ScanId, patch: ScanPatch) -> StorageResult<ScanRecord> {
        let mut record = self
            .read(scan_id)
            .await?
            .ok_or_else(|| StorageError::NotFound(scan_id.to_string()))?;
        record.apply(patch);
        self.write(&record).await?;
        Ok(record)
    }
}
