//! Device-Resolver: canonical device records from manufacturer model codes
//!
//! This crate resolves opaque model codes (e.g. `SM-A245F`, `moto g(30)`) into
//! canonical product records by querying several unreliable external catalogs
//! in a fixed fallback order, merging their partial answers and persisting
//! exactly one record per identifier.

pub mod batch;
pub mod config;
pub mod normalize;
pub mod pool;
pub mod record;
pub mod resolver;
pub mod sources;
pub mod storage;

use thiserror::Error;

/// Main error type for Device-Resolver operations
#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Session pool error: {0}")]
    Pool(#[from] pool::PoolError),

    #[error("Browser session error: {0}")]
    Session(#[from] pool::SessionError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input at line {line}: {message}")]
    Input { line: usize, message: String },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Device-Resolver operations
pub type Result<T> = std::result::Result<T, ResolverError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use normalize::{infer_brand, normalize_name, rank, Brand};
pub use record::{BatchItem, Identifier, Resolution};
pub use resolver::{is_complete, Method, Resolve, Resolver};
