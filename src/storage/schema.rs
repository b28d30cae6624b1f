//! Database schema definitions
//!
//! This module contains the SQL schema for the local scan database.

/// SQL schema for the database
///
/// The full record is kept as JSON; the columns next to it exist so that
/// scans can be inspected with plain SQL.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS scans (
    scan_id TEXT PRIMARY KEY,
    url TEXT NOT NULL,
    requester TEXT NOT NULL,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    completed_at TEXT,
    pages_scanned INTEGER NOT NULL DEFAULT 0,
    pages_found INTEGER NOT NULL DEFAULT 0,
    issues_total INTEGER NOT NULL DEFAULT 0,
    accessibility_score INTEGER,
    deep_scan_triggered INTEGER NOT NULL DEFAULT 0,
    record_json TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_scans_status ON scans(status);
CREATE INDEX IF NOT EXISTS idx_scans_created ON scans(created_at);
"#;

/// Initializes the database schema
///
/// This function creates all necessary tables and indexes if they don't exist.
/// It's safe to call multiple times.
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
