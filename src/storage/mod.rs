//! Storage module for persisting scan records
//!
//! This module handles all persistence for the engine, including:
//! - SQLite database initialization and schema management
//! - An HTTP object store for scan records and report artifacts
//! - Falling back to the local database when the object store fails

mod fallback;
mod remote;
mod schema;
mod sqlite;
mod traits;

pub use fallback::FallbackScanStore;
pub use remote::{ObjectStore, RemoteScanStore};
pub use sqlite::SqliteScanStore;
pub use traits::{ScanStore, StorageError, StorageResult};

use crate::config::StorageConfig;
use std::path::Path;
use std::sync::Arc;

/// Opens the scan store described by the configuration
///
/// Without a remote section this is the local SQLite database. With one,
/// records go to the object store first and to the database when that fails.
///
/// # Arguments
///
/// * `config` - The storage configuration
///
/// # Returns
///
/// * `Ok(Arc<dyn ScanStore>)` - Ready to use store
/// * `Err(StorageError)` - Failed to open the database or build the HTTP client
pub fn open_store(config: &StorageConfig) -> StorageResult<Arc<dyn ScanStore>> {
    let local: Arc<dyn ScanStore> = Arc::new(SqliteScanStore::new(Path::new(&config.database_path))?);

    match &config.remote {
        Some(remote) => {
            tracing::info!("Using object store at {} with local fallback", remote.endpoint);
            let remote: Arc<dyn ScanStore> = Arc::new(RemoteScanStore::new(ObjectStore::new(remote)?));
            Ok(Arc::new(FallbackScanStore::new(remote, local)))
        }
        None => Ok(local),
    }
}

/// Opens the object store used for report artifacts, if configured
pub fn open_object_store(config: &StorageConfig) -> StorageResult<Option<ObjectStore>> {
    config.remote.as_ref().map(ObjectStore::new).transpose()
}
