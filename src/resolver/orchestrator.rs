//! Resolution orchestrator
//!
//! Runs the strategies in their fixed order, each bounded by the strategy
//! timeout, and stops at the first record that passes the completeness gate.
//! Nothing in here knows which sites sit behind the adapters.

use super::merge::fill_gaps;
use super::strategy::{Method, StrategyCounters};
use crate::config::ResolverConfig;
use crate::normalize::{clean_device_name, is_valid_device_name, normalize_name, rank, Brand};
use crate::record::{BatchItem, CandidateLink, FailureRecord, Identifier, PartialRecord, Resolution, ResolvedRecord};
use crate::sources::{AdapterError, SourceAdapter, Sources};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Reason recorded when every strategy ran without an error but none produced
/// an acceptable record
pub const EXHAUSTED_REASON: &str = "all strategies exhausted without a complete record";

/// Anything that turns a batch item into a terminal resolution
#[async_trait]
pub trait Resolve: Send + Sync {
    async fn resolve(&self, item: &BatchItem) -> Resolution;
}

#[derive(Debug, Clone)]
pub struct ResolverOptions {
    pub strategy_timeout: Duration,

    /// Query the secondary catalog for a date when the accepted record has none
    pub enrich_missing_dates: bool,
}

impl ResolverOptions {
    pub fn from_config(config: &ResolverConfig) -> Self {
        Self {
            strategy_timeout: config.strategy_timeout(),
            enrich_missing_dates: config.enrich_missing_dates,
        }
    }
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            strategy_timeout: Duration::from_secs(120),
            enrich_missing_dates: true,
        }
    }
}

/// Per-identifier state carried across strategies
struct Attempt<'a> {
    identifier: &'a Identifier,
    brand: Brand,

    /// Secondary catalog record, once looked up
    secondary: Option<PartialRecord>,
    secondary_consulted: bool,
}

impl<'a> Attempt<'a> {
    fn new(identifier: &'a Identifier, brand: Brand) -> Self {
        Self {
            identifier,
            brand,
            secondary: None,
            secondary_consulted: false,
        }
    }
}

pub struct Resolver {
    sources: Sources,
    counters: Arc<StrategyCounters>,
    options: ResolverOptions,
}

impl Resolver {
    pub fn new(sources: Sources, counters: Arc<StrategyCounters>, options: ResolverOptions) -> Self {
        Self {
            sources,
            counters,
            options,
        }
    }

    pub fn counters(&self) -> &Arc<StrategyCounters> {
        &self.counters
    }

    /// Resolves one identifier into exactly one terminal record
    ///
    /// Never fails: adapter errors and timeouts are logged, and the last one
    /// becomes the failure reason if no strategy succeeds.
    pub async fn resolve(&self, item: &BatchItem) -> Resolution {
        let identifier = &item.identifier;
        let brand = item.brand();

        tracing::debug!("Resolving {} (brand {})", identifier, brand);

        let mut attempt = Attempt::new(identifier, brand);
        let mut last_error: Option<String> = None;

        for method in Method::ALL {
            if !applies(method, identifier) {
                continue;
            }

            self.counters.record_attempt(method);
            tracing::debug!("{}: trying {}", identifier, method);

            let outcome = tokio::time::timeout(
                self.options.strategy_timeout,
                self.run_strategy(method, &mut attempt),
            )
            .await;

            let candidate = match outcome {
                Ok(Ok(Some(candidate))) => candidate,
                Ok(Ok(None)) => {
                    tracing::debug!("{}: {} found nothing", identifier, method);
                    continue;
                }
                Ok(Err(e)) => {
                    tracing::warn!("{}: {} failed: {}", identifier, method, e);
                    last_error = Some(format!("{}: {}", method, e));
                    continue;
                }
                Err(_) => {
                    tracing::warn!(
                        "{}: {} timed out after {:?}",
                        identifier,
                        method,
                        self.options.strategy_timeout
                    );
                    last_error = Some(format!(
                        "{}: timed out after {:?}",
                        method, self.options.strategy_timeout
                    ));
                    if method == Method::NameResolution {
                        attempt.secondary = None;
                        attempt.secondary_consulted = false;
                    }
                    continue;
                }
            };

            let mut record =
                ResolvedRecord::from_partial(identifier.clone(), candidate, brand, method);
            if let Some(secondary) = &attempt.secondary {
                fill_gaps(&mut record, secondary);
            }

            if !record.is_complete() {
                tracing::debug!(
                    "{}: {} returned incomplete record '{}'",
                    identifier,
                    method,
                    record.device_name
                );
                continue;
            }

            self.counters.record_hit(method);
            self.enrich(&mut record, &mut attempt).await;
            tracing::debug!("{}: accepted '{}' via {}", identifier, record.device_name, method);
            return Resolution::Resolved(record);
        }

        let reason = last_error.unwrap_or_else(|| EXHAUSTED_REASON.to_string());
        Resolution::Failed(FailureRecord::new(identifier.clone(), reason))
    }

    async fn run_strategy(
        &self,
        method: Method,
        attempt: &mut Attempt<'_>,
    ) -> Result<Option<PartialRecord>, AdapterError> {
        match method {
            Method::BrandSpecial => self.brand_special(attempt).await,
            Method::CrossReference => self.cross_reference(attempt).await,
            Method::NameResolution => self.name_resolution(attempt).await,
            Method::Direct => self.direct(attempt).await,
        }
    }

    async fn brand_special(&self, attempt: &Attempt<'_>) -> Result<Option<PartialRecord>, AdapterError> {
        let query = normalize_name(attempt.identifier.as_str(), Some(attempt.brand));
        let candidates = self.sources.primary.search_by_name(&query).await?;
        self.extract_best(&*self.sources.primary, &candidates, &query).await
    }

    async fn cross_reference(&self, attempt: &Attempt<'_>) -> Result<Option<PartialRecord>, AdapterError> {
        self.counters.record_web_search();
        let links = self
            .sources
            .cross_reference
            .find_links(attempt.identifier.as_str(), &self.sources.primary_domain)
            .await?;

        let Some(link) = links.first() else {
            return Ok(None);
        };
        tracing::debug!("{}: cross-reference hit {}", attempt.identifier, link.target);

        let record = self.sources.primary.extract_detail(&link.target).await?;
        Ok(Some(record))
    }

    async fn name_resolution(&self, attempt: &mut Attempt<'_>) -> Result<Option<PartialRecord>, AdapterError> {
        let Some(secondary) = self.lookup_secondary(attempt).await? else {
            return Ok(None);
        };

        let name = clean_device_name(&secondary.device_name);
        if !is_valid_device_name(&name) {
            tracing::debug!(
                "{}: secondary name '{}' is not usable",
                attempt.identifier,
                secondary.device_name
            );
            return Ok(None);
        }

        let candidates = self.sources.primary.search_by_name(&name).await?;
        self.extract_best(&*self.sources.primary, &candidates, &name).await
    }

    async fn direct(&self, attempt: &Attempt<'_>) -> Result<Option<PartialRecord>, AdapterError> {
        let identifier = attempt.identifier.as_str();
        let candidates = self
            .sources
            .primary
            .search_by_identifier(identifier, Some(attempt.brand))
            .await?;
        self.extract_best(&*self.sources.primary, &candidates, identifier).await
    }

    /// Looks the identifier up in the secondary catalog, at most once per attempt
    async fn lookup_secondary(&self, attempt: &mut Attempt<'_>) -> Result<Option<PartialRecord>, AdapterError> {
        if attempt.secondary_consulted {
            return Ok(attempt.secondary.clone());
        }
        attempt.secondary_consulted = true;
        self.counters.record_secondary_lookup();

        let query = normalize_name(attempt.identifier.as_str(), Some(attempt.brand));
        let candidates = self
            .sources
            .secondary
            .search_by_identifier(&query, Some(attempt.brand))
            .await?;

        let record = self.extract_best(&*self.sources.secondary, &candidates, &query).await?;
        if let Some(record) = &record {
            tracing::debug!(
                "{}: secondary catalog says '{}' (announced '{}')",
                attempt.identifier,
                record.device_name,
                record.announced_date
            );
        }
        attempt.secondary = record.clone();
        Ok(record)
    }

    async fn extract_best(
        &self,
        adapter: &dyn SourceAdapter,
        candidates: &[CandidateLink],
        target: &str,
    ) -> Result<Option<PartialRecord>, AdapterError> {
        let Some(best) = rank(candidates, target) else {
            return Ok(None);
        };

        let mut record = adapter.extract_detail(&best.target).await?;
        record.is_closest_match |= best.closest_match;
        Ok(Some(record))
    }

    /// Fills a missing announce date from the secondary catalog
    async fn enrich(&self, record: &mut ResolvedRecord, attempt: &mut Attempt<'_>) {
        if !self.options.enrich_missing_dates
            || !record.announced_date.trim().is_empty()
            || attempt.secondary_consulted
        {
            return;
        }

        let lookup = tokio::time::timeout(self.options.strategy_timeout, self.lookup_secondary(attempt)).await;
        match lookup {
            Ok(Ok(Some(secondary))) => {
                if fill_gaps(record, &secondary) && record.announced_date_source == secondary.source {
                    self.counters.record_date_enrichment();
                    tracing::debug!(
                        "{}: announce date '{}' taken from {}",
                        record.identifier,
                        record.announced_date,
                        secondary.source
                    );
                }
            }
            Ok(Ok(None)) => {}
            Ok(Err(e)) => tracing::debug!("{}: date enrichment failed: {}", record.identifier, e),
            Err(_) => tracing::debug!("{}: date enrichment timed out", record.identifier),
        }
    }
}

#[async_trait]
impl Resolve for Resolver {
    async fn resolve(&self, item: &BatchItem) -> Resolution {
        Resolver::resolve(self, item).await
    }
}

/// Whether a strategy is worth running for this identifier
fn applies(method: Method, identifier: &Identifier) -> bool {
    match method {
        Method::BrandSpecial => identifier.as_str().to_lowercase().starts_with("moto"),
        _ => true,
    }
}
