use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Device-Resolver
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub resolver: ResolverConfig,
    pub http: HttpConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    pub output: OutputConfig,
    #[serde(rename = "known-mapping", default)]
    pub known_mappings: Vec<KnownMapping>,
}

/// Resolution pipeline behavior
#[derive(Debug, Clone, Deserialize)]
pub struct ResolverConfig {
    /// Number of browser sessions created at startup
    #[serde(rename = "pool-size")]
    pub pool_size: u32,

    /// Base interval between requests of one consumer (seconds)
    #[serde(rename = "base-delay-seconds")]
    pub base_delay_seconds: f64,

    /// How long a worker waits for a pooled session before overflowing (seconds)
    #[serde(rename = "acquire-timeout-seconds")]
    pub acquire_timeout_seconds: u64,

    /// Optional cap on the number of identifiers processed per run
    #[serde(rename = "per-item-limit", default)]
    pub per_item_limit: Option<usize>,

    /// Number of concurrent workers (never more than the pool size)
    #[serde(default = "default_workers")]
    pub workers: u32,

    /// Upper bound for a single fallback strategy (seconds)
    #[serde(rename = "strategy-timeout-seconds", default = "default_strategy_timeout")]
    pub strategy_timeout_seconds: u64,

    /// Query the secondary catalog for a date when the accepted record has none
    #[serde(rename = "enrich-missing-dates", default = "default_true")]
    pub enrich_missing_dates: bool,

    /// Skip identifiers that already have a resolved record in the store
    #[serde(rename = "skip-resolved", default = "default_true")]
    pub skip_resolved: bool,
}

impl ResolverConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_secs_f64(self.base_delay_seconds.max(0.0))
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }

    pub fn strategy_timeout(&self) -> Duration {
        Duration::from_secs(self.strategy_timeout_seconds)
    }
}

/// HTTP client settings shared by every adapter
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-seconds", default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// User agents rotated across requests
    #[serde(rename = "user-agents")]
    pub user_agents: Vec<String>,

    /// Accept-Language header value
    #[serde(rename = "accept-language", default = "default_accept_language")]
    pub accept_language: String,
}

/// Headless browser settings
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Path to a Chrome/Chromium binary; auto-detected when absent
    #[serde(default)]
    pub executable: Option<String>,

    /// Upper bound for one page render (seconds)
    #[serde(rename = "page-load-timeout-seconds", default = "default_page_load_timeout")]
    pub page_load_timeout_seconds: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            page_load_timeout_seconds: default_page_load_timeout(),
        }
    }
}

/// Base URLs of the external catalogs
#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    #[serde(rename = "primary-base-url", default = "default_primary_base_url")]
    pub primary_base_url: String,

    #[serde(rename = "secondary-base-url", default = "default_secondary_base_url")]
    pub secondary_base_url: String,

    #[serde(rename = "search-base-url", default = "default_search_base_url")]
    pub search_base_url: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            primary_base_url: default_primary_base_url(),
            secondary_base_url: default_secondary_base_url(),
            search_base_url: default_search_base_url(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Identifier whose primary-catalog page is known ahead of time
#[derive(Debug, Clone, Deserialize)]
pub struct KnownMapping {
    pub identifier: String,

    /// Page path relative to the primary catalog base URL
    pub path: String,
}

fn default_workers() -> u32 {
    1
}

fn default_strategy_timeout() -> u64 {
    120
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    30
}

fn default_accept_language() -> String {
    "en-US,en;q=0.9".to_string()
}

fn default_page_load_timeout() -> u64 {
    30
}

fn default_primary_base_url() -> String {
    "https://www.gsmarena.com".to_string()
}

fn default_secondary_base_url() -> String {
    "https://www.gsmchoice.com".to_string()
}

fn default_search_base_url() -> String {
    "https://www.google.com".to_string()
}
