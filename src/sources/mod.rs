//! External catalog adapters
//!
//! Every catalog is wrapped in a `SourceAdapter`: a search by model code, a
//! search by display name, and detail extraction from a result page. The
//! cross-reference web search only finds links, so it gets the smaller
//! `LinkSearch` interface.
//!
//! Adapters never panic on unexpected markup; they report an `AdapterError`
//! and let the resolver move on to its next strategy.

mod fetcher;
mod gsmarena;
mod gsmchoice;
mod html;
mod web_search;

pub use fetcher::{build_http_client, Fetcher};
pub use gsmarena::{parse_device_page, parse_search_results, GsmArena, PRIMARY_SOURCE};
pub use gsmchoice::{parse_catalogue_page, GsmChoice, SECONDARY_SOURCE};
pub use web_search::{parse_result_links, WebSearch};

use crate::config::Config;
use crate::normalize::Brand;
use crate::pool::{PoolError, SessionError, SessionFactory, SessionPool};
use crate::record::{CandidateLink, PartialRecord};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Why an adapter call produced no usable result
#[derive(Debug, Error)]
pub enum AdapterError {
    /// No session or connection could be obtained
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The source answered with markup or JSON we could not make sense of
    #[error("Unexpected response structure: {0}")]
    Parse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("HTTP {status} for {url}")]
    Http { url: String, status: u16 },

    #[error("Network error: {0}")]
    Network(String),
}

impl From<PoolError> for AdapterError {
    fn from(e: PoolError) -> Self {
        match e {
            PoolError::Session(SessionError::Timeout(after)) => {
                Self::Timeout(format!("page render exceeded {:?}", after))
            }
            other => Self::Unavailable(other.to_string()),
        }
    }
}

/// A catalog that can be searched and read
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Short source tag recorded with every extracted field
    fn name(&self) -> &str;

    /// Searches the catalog for a raw model code
    async fn search_by_identifier(
        &self,
        identifier: &str,
        brand: Option<Brand>,
    ) -> Result<Vec<CandidateLink>, AdapterError>;

    /// Searches the catalog for a display name
    async fn search_by_name(&self, name: &str) -> Result<Vec<CandidateLink>, AdapterError>;

    /// Extracts a record from a detail page returned by a search
    async fn extract_detail(&self, reference: &str) -> Result<PartialRecord, AdapterError>;
}

/// A web search that can be restricted to one site
#[async_trait]
pub trait LinkSearch: Send + Sync {
    fn name(&self) -> &str;

    async fn find_links(
        &self,
        query: &str,
        site_domain: &str,
    ) -> Result<Vec<CandidateLink>, AdapterError>;
}

/// The adapters one resolver works with
#[derive(Clone)]
pub struct Sources {
    /// The richest catalog; the one every strategy ends up reading from
    pub primary: Arc<dyn SourceAdapter>,

    /// Lighter catalog used to turn model codes into display names
    pub secondary: Arc<dyn SourceAdapter>,

    pub cross_reference: Arc<dyn LinkSearch>,

    /// Site the cross-reference search is restricted to
    pub primary_domain: String,
}

impl Sources {
    /// Builds the configured adapters for one worker
    ///
    /// # Arguments
    ///
    /// * `config` - The resolver configuration
    /// * `client` - Shared HTTP client
    /// * `pool` - Shared session pool (its rate limiter paces every adapter)
    /// * `worker` - Consumer identity used for rate limiting
    pub fn build<F: SessionFactory>(
        config: &Config,
        client: Client,
        pool: Arc<SessionPool<F>>,
        worker: &str,
    ) -> Result<Self, url::ParseError> {
        let http = Arc::new(config.http.clone());
        let limiter = Arc::clone(pool.limiter());
        let acquire_timeout = config.resolver.acquire_timeout();

        let primary_base = Url::parse(&config.sources.primary_base_url)?;
        let primary_domain = primary_base.host_str().unwrap_or_default().to_string();

        let primary = GsmArena::new(
            primary_base,
            Fetcher::new(
                client.clone(),
                Arc::clone(&http),
                Arc::clone(&limiter),
                format!("{}:{}", worker, PRIMARY_SOURCE),
            ),
            Arc::clone(&pool),
            acquire_timeout,
        )
        .with_known_mappings(&config.known_mappings);

        let secondary = GsmChoice::new(
            Url::parse(&config.sources.secondary_base_url)?,
            Fetcher::new(
                client,
                http,
                limiter,
                format!("{}:{}", worker, SECONDARY_SOURCE),
            ),
        );

        let cross_reference = WebSearch::new(
            Url::parse(&config.sources.search_base_url)?,
            pool,
            format!("{}:search", worker),
            acquire_timeout,
        );

        Ok(Self {
            primary: Arc::new(primary),
            secondary: Arc::new(secondary),
            cross_reference: Arc::new(cross_reference),
            primary_domain,
        })
    }
}
