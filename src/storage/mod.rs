//! Storage module for persisting resolution results
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Idempotent writes of resolved and failure records
//! - Run tracking for resumption and statistics

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{ResultStore, StorageError, StorageResult};

use crate::ResolverError;
use std::fmt;
use std::path::Path;

/// Opens the result database at `path`, creating file and tables as needed
pub fn open_store(path: &Path) -> Result<SqliteStore, ResolverError> {
    let store = SqliteStore::new(path)?;
    tracing::debug!("Opened result store at {}", path.display());
    Ok(store)
}

/// One invocation of the batch driver, as recorded in the `runs` table
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    /// RFC 3339 timestamps
    pub started_at: String,
    pub finished_at: Option<String>,
    /// Hash of the configuration file the run was started with
    pub config_hash: String,
    pub status: RunStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    /// The run stopped before every item had a terminal record
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        [Self::Running, Self::Completed, Self::Failed]
            .into_iter()
            .find(|status| status.as_str() == raw)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
