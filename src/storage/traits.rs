//! Storage traits and error types

use crate::record::{FailureRecord, Identifier, ResolvedRecord};
use crate::storage::{RunRecord, RunStatus};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable, idempotent store of terminal records
///
/// Every writer is its own transaction and is durable once it returns.
pub trait ResultStore {
    // ===== Run Management =====

    /// Creates a new batch run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Stamps the finish time and final status of a run
    fn complete_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    // ===== Records =====

    /// Writes a resolved record unless one already exists for the identifier
    ///
    /// Any failure row for the same identifier is removed in the same
    /// transaction.
    ///
    /// # Returns
    ///
    /// `true` if a row was created.
    fn upsert_resolved(&mut self, record: &ResolvedRecord) -> StorageResult<bool>;

    /// Writes a failure record unless the identifier already has any record
    ///
    /// # Returns
    ///
    /// `true` if a row was created.
    fn append_failure(&mut self, record: &FailureRecord) -> StorageResult<bool>;

    fn get_resolved(&self, identifier: &Identifier) -> StorageResult<Option<ResolvedRecord>>;

    fn get_failure(&self, identifier: &Identifier) -> StorageResult<Option<FailureRecord>>;

    fn is_resolved(&self, identifier: &Identifier) -> StorageResult<bool>;

    // ===== Statistics =====

    fn count_resolved(&self) -> StorageResult<u64>;

    fn count_failed(&self) -> StorageResult<u64>;

    /// Resolved record count per `method_used` tag
    fn count_by_method(&self) -> StorageResult<BTreeMap<String, u64>>;

    /// All resolved records, ordered by identifier
    fn list_resolved(&self) -> StorageResult<Vec<ResolvedRecord>>;

    /// All failure records, most recent first
    fn list_failures(&self) -> StorageResult<Vec<FailureRecord>>;
}
