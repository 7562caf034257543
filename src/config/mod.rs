//! Configuration module for Device-Resolver
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use device_resolver::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("resolver.toml")).unwrap();
//! println!("Browser sessions: {}", config.resolver.pool_size);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BrowserConfig, Config, HttpConfig, KnownMapping, OutputConfig, ResolverConfig, SourcesConfig,
};

// Re-export parser functions
pub use parser::{config_hash, load_config, load_config_with_hash, parse_config};
