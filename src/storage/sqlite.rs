//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ScanStore trait.

use crate::scan::{ScanId, ScanRecord, ScanStatus};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ScanStore, StorageError, StorageResult};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite storage backend
pub struct SqliteScanStore {
    conn: Mutex<Connection>,
}

impl SqliteScanStore {
    /// Creates a new SqliteScanStore instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteScanStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Database("connection mutex poisoned".to_string()))
    }

    /// Counts stored scans with the given status
    pub fn count_by_status(&self, status: ScanStatus) -> StorageResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM scans WHERE status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn upsert(conn: &Connection, record: &ScanRecord, insert_only: bool) -> StorageResult<usize> {
        let json = serde_json::to_string(record)?;
        let sql = if insert_only {
            "INSERT OR IGNORE INTO scans (scan_id, url, requester, status, created_at, completed_at,
                 pages_scanned, pages_found, issues_total, accessibility_score, deep_scan_triggered,
                 record_json, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
        } else {
            "INSERT INTO scans (scan_id, url, requester, status, created_at, completed_at,
                 pages_scanned, pages_found, issues_total, accessibility_score, deep_scan_triggered,
                 record_json, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
             ON CONFLICT(scan_id) DO UPDATE SET
                 status = excluded.status,
                 completed_at = excluded.completed_at,
                 pages_scanned = excluded.pages_scanned,
                 pages_found = excluded.pages_found,
                 issues_total = excluded.issues_total,
                 accessibility_score = excluded.accessibility_score,
                 deep_scan_triggered = excluded.deep_scan_triggered,
                 record_json = excluded.record_json,
                 updated_at = excluded.updated_at"
        };

        let changed = conn.execute(
            sql,
            params![
                record.scan_id.to_string(),
                record.url,
                record.requester,
                record.status.to_db_string(),
                record.created_at.to_rfc3339(),
                record.completed_at.map(|t| t.to_rfc3339()),
                record.pages_scanned,
                record.pages_found,
                record.issues.total as i64,
                record.accessibility_score,
                record.deep_scan_triggered,
                json,
                Utc::now().to_rfc3339(),
            ],
        )?;

        Ok(changed)
    }
}

#[async_trait]
impl ScanStore for SqliteScanStore {
    async fn create(&self, record: &ScanRecord) -> StorageResult<()> {
        let conn = self.lock()?;
        if Self::upsert(&conn, record, true)? == 0 {
            return Err(StorageError::AlreadyExists(record.scan_id.to_string()));
        }
        Ok(())
    }

    async fn read(&self, scan_id: &ScanId) -> StorageResult<Option<ScanRecord>> {
        let conn = self.lock()?;
        let json: Option<String> = conn
            .query_row(
                "SELECT record_json FROM scans WHERE scan_id = ?1",
                params![scan_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn write(&self, record: &ScanRecord) -> StorageResult<()> {
        let conn = self.lock()?;
        Self::upsert(&conn, record, false)?;
        Ok(())
    }
}
