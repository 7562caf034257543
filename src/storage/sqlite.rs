//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ResultStore trait.

use crate::normalize::Brand;
use crate::record::{FailureRecord, Identifier, ResolvedRecord};
use crate::resolver::Method;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ResultStore, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use crate::ResolverError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::Path;

const RESOLVED_COLUMNS: &str = "identifier, device_name, announced_date, announced_date_source, \
     price, price_source, inferred_brand, source_reference, method_used, is_closest_match, \
     specifications, resolved_at";

/// SQLite storage backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Creates a new SqliteStore instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(ResolverError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, ResolverError> {
        let conn = Connection::open(path)?;

        // Every record must survive a crash as soon as its write returns
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = FULL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (tests and dry runs)
    pub fn new_in_memory() -> Result<Self, ResolverError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn query_resolved(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> StorageResult<Vec<ResolvedRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(args, RawResolved::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(RawResolved::into_record).collect()
    }

    fn query_failures(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> StorageResult<Vec<FailureRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(args, |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(identifier, reason, failed_at)| {
                Ok(FailureRecord {
                    identifier: parse_identifier(&identifier)?,
                    reason,
                    failed_at: parse_timestamp(&failed_at)?,
                })
            })
            .collect()
    }

    fn count(&self, sql: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

/// Columns of a `resolved_records` row before conversion
struct RawResolved {
    identifier: String,
    device_name: String,
    announced_date: String,
    announced_date_source: String,
    price: String,
    price_source: String,
    inferred_brand: String,
    source_reference: String,
    method_used: String,
    is_closest_match: bool,
    specifications: String,
    resolved_at: String,
}

impl RawResolved {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            identifier: row.get(0)?,
            device_name: row.get(1)?,
            announced_date: row.get(2)?,
            announced_date_source: row.get(3)?,
            price: row.get(4)?,
            price_source: row.get(5)?,
            inferred_brand: row.get(6)?,
            source_reference: row.get(7)?,
            method_used: row.get(8)?,
            is_closest_match: row.get(9)?,
            specifications: row.get(10)?,
            resolved_at: row.get(11)?,
        })
    }

    fn into_record(self) -> StorageResult<ResolvedRecord> {
        let method_used = Method::from_tag(&self.method_used).ok_or_else(|| {
            StorageError::Serialization(format!("unknown method tag '{}'", self.method_used))
        })?;

        Ok(ResolvedRecord {
            identifier: parse_identifier(&self.identifier)?,
            device_name: self.device_name,
            announced_date: self.announced_date,
            announced_date_source: self.announced_date_source,
            price: self.price,
            price_source: self.price_source,
            inferred_brand: Brand::from_name(&self.inferred_brand),
            source_reference: self.source_reference,
            method_used,
            is_closest_match: self.is_closest_match,
            specifications: serde_json::from_str(&self.specifications)?,
            resolved_at: parse_timestamp(&self.resolved_at)?,
        })
    }
}

fn parse_identifier(raw: &str) -> StorageResult<Identifier> {
    Identifier::parse(raw)
        .ok_or_else(|| StorageError::Serialization(format!("invalid stored identifier '{}'", raw)))
}

fn parse_timestamp(raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StorageError::Serialization(format!("invalid timestamp '{}': {}", raw, e)))
}

fn row_to_run(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::parse(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Running),
    })
}

impl ResultStore for SqliteStore {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.as_str()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs WHERE id = ?1",
                params![run_id],
                row_to_run,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
                [],
                row_to_run,
            )
            .optional()?;
        Ok(run)
    }

    fn complete_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET finished_at = ?1, status = ?2 WHERE id = ?3",
            params![now, status.as_str(), run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Records =====

    fn upsert_resolved(&mut self, record: &ResolvedRecord) -> StorageResult<bool> {
        let specifications = serde_json::to_string(&record.specifications)?;

        let tx = self.conn.transaction()?;
        let inserted = tx.execute(
            &format!(
                "INSERT OR IGNORE INTO resolved_records ({}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                RESOLVED_COLUMNS
            ),
            params![
                record.identifier.as_str(),
                record.device_name,
                record.announced_date,
                record.announced_date_source,
                record.price,
                record.price_source,
                record.inferred_brand.name(),
                record.source_reference,
                record.method_used.as_tag(),
                record.is_closest_match,
                specifications,
                record.resolved_at.to_rfc3339(),
            ],
        )?;
        tx.execute(
            "DELETE FROM failure_records WHERE identifier = ?1",
            params![record.identifier.as_str()],
        )?;
        tx.commit()?;

        Ok(inserted > 0)
    }

    fn append_failure(&mut self, record: &FailureRecord) -> StorageResult<bool> {
        let inserted = self.conn.execute(
            "INSERT INTO failure_records (identifier, reason, failed_at)
             SELECT ?1, ?2, ?3
             WHERE NOT EXISTS (SELECT 1 FROM resolved_records WHERE identifier = ?1)
               AND NOT EXISTS (SELECT 1 FROM failure_records WHERE identifier = ?1)",
            params![
                record.identifier.as_str(),
                record.reason,
                record.failed_at.to_rfc3339()
            ],
        )?;
        Ok(inserted > 0)
    }

    fn get_resolved(&self, identifier: &Identifier) -> StorageResult<Option<ResolvedRecord>> {
        let mut records = self.query_resolved(
            &format!(
                "SELECT {} FROM resolved_records WHERE identifier = ?1",
                RESOLVED_COLUMNS
            ),
            &[&identifier.as_str()],
        )?;
        Ok(records.pop())
    }

    fn get_failure(&self, identifier: &Identifier) -> StorageResult<Option<FailureRecord>> {
        let mut records = self.query_failures(
            "SELECT identifier, reason, failed_at FROM failure_records WHERE identifier = ?1",
            &[&identifier.as_str()],
        )?;
        Ok(records.pop())
    }

    fn is_resolved(&self, identifier: &Identifier) -> StorageResult<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM resolved_records WHERE identifier = ?1",
                params![identifier.as_str()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    // ===== Statistics =====

    fn count_resolved(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM resolved_records")
    }

    fn count_failed(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM failure_records")
    }

    fn count_by_method(&self) -> StorageResult<BTreeMap<String, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT method_used, COUNT(*) FROM resolved_records GROUP BY method_used")?;

        let counts = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(counts)
    }

    fn list_resolved(&self) -> StorageResult<Vec<ResolvedRecord>> {
        self.query_resolved(
            &format!(
                "SELECT {} FROM resolved_records ORDER BY identifier",
                RESOLVED_COLUMNS
            ),
            &[],
        )
    }

    fn list_failures(&self) -> StorageResult<Vec<FailureRecord>> {
        self.query_failures(
            "SELECT identifier, reason, failed_at FROM failure_records ORDER BY failed_at DESC, identifier",
            &[],
        )
    }
}
