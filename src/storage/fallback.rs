//! Primary store with a local fallback

use crate::scan::{ScanId, ScanRecord, ScanStatus};
use crate::storage::traits::{ScanStore, StorageResult};
use async_trait::async_trait;
use std::sync::Arc;

/// Writes go to the primary store and fall back on failure
///
/// Reads use the fallback when the primary fails or has no record. When both
/// hold the scan, the copy further along its lifecycle wins.
pub struct FallbackScanStore {
    primary: Arc<dyn ScanStore>,
    fallback: Arc<dyn ScanStore>,
}

impl FallbackScanStore {
    pub fn new(primary: Arc<dyn ScanStore>, fallback: Arc<dyn ScanStore>) -> Self {
        Self { primary, fallback }
    }
}

/// Lifecycle position of a record; statuses only move forward
fn progress(record: &ScanRecord) -> (u8, u32) {
    let stage = match record.status {
        ScanStatus::Pending => 0,
        ScanStatus::Running => 1,
        ScanStatus::Completed | ScanStatus::Failed => 2,
    };
    (stage, record.pages_scanned)
}

#[async_trait]
impl ScanStore for FallbackScanStore {
    async fn create(&self, record: &ScanRecord) -> StorageResult<()> {
        match self.primary.create(record).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!(
                    "Primary store failed to create {}, using fallback: {}",
                    record.scan_id,
                    e
                );
                self.fallback.create(record).await
            }
        }
    }

    async fn read(&self, scan_id: &ScanId) -> StorageResult<Option<ScanRecord>> {
        let primary = match self.primary.read(scan_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::debug!("Scan {} not in primary store", scan_id);
                return self.fallback.read(scan_id).await;
            }
            Err(e) => {
                tracing::warn!(
                    "Primary store failed to read {}, using fallback: {}",
                    scan_id,
                    e
                );
                return self.fallback.read(scan_id).await;
            }
        };

        // A write the primary rejected may have landed only in the fallback
        match self.fallback.read(scan_id).await {
            Ok(Some(local)) if progress(&local) > progress(&primary) => {
                tracing::debug!(
                    "Fallback copy of {} is further along ({} vs {})",
                    scan_id,
                    local.status,
                    primary.status
                );
                Ok(Some(local))
            }
            Ok(_) => Ok(Some(primary)),
            Err(e) => {
                tracing::warn!("Fallback store failed to read {}: {}", scan_id, e);
                Ok(Some(primary))
            }
        }
    }

    async fn write(&self, record: &ScanRecord) -> StorageResult<()> {
        match self.primary.write(record).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!(
                    "Primary store failed to write {}, using fallback: {}",
                    record.scan_id,
                    e
                );
                self.fallback.write(record).await
            }
        }
    }
}
