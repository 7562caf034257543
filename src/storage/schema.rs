//! Database schema definitions
//!
//! One row per identifier in exactly one of `resolved_records` and
//! `failure_records`; the identifier is the primary key of both.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track batch runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- Accepted records, never overwritten once written
CREATE TABLE IF NOT EXISTS resolved_records (
    identifier TEXT PRIMARY KEY,
    device_name TEXT NOT NULL,
    announced_date TEXT NOT NULL DEFAULT '',
    announced_date_source TEXT NOT NULL DEFAULT '',
    price TEXT NOT NULL DEFAULT '',
    price_source TEXT NOT NULL DEFAULT '',
    inferred_brand TEXT NOT NULL,
    source_reference TEXT NOT NULL,
    method_used TEXT NOT NULL,
    is_closest_match INTEGER NOT NULL DEFAULT 0,
    specifications TEXT NOT NULL DEFAULT '{}',
    resolved_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_resolved_method ON resolved_records(method_used);

-- Identifiers no strategy could resolve
CREATE TABLE IF NOT EXISTS failure_records (
    identifier TEXT PRIMARY KEY,
    reason TEXT NOT NULL,
    failed_at TEXT NOT NULL
);
"#;

/// Initializes the database schema
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
