//! Batch processing
//!
//! This module provides:
//! - `BatchDriver`: feeds identifiers to per-worker resolvers and persists results
//! - `Summary` / `print_summary`: what a run did
//! - `load_batch_items`: input file parsing
//! - `run_batch`: wires config, store, browser pool and adapters into one run

mod driver;
mod input;
mod summary;

pub use driver::{jitter, BatchDriver, DriverOptions};
pub use input::{load_batch_items, parse_batch_items};
pub use summary::{load_statistics, print_statistics, print_summary, StoreStatistics, Summary};

use crate::config::Config;
use crate::pool::{BrowserSessionFactory, RateLimiter, SessionPool};
use crate::record::BatchItem;
use crate::resolver::{Resolver, ResolverOptions, StrategyCounters};
use crate::sources::{build_http_client, Sources};
use crate::storage::{open_store, ResultStore, RunStatus};
use crate::ResolverError;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

/// Runs a complete batch against the live sources
///
/// # Process
///
/// 1. Open the store and record the run
/// 2. Build the HTTP client, the browser pool and one resolver per worker
/// 3. Resolve every item, persisting each result as it arrives
/// 4. Close the run and shut the pool down
///
/// # Arguments
///
/// * `config` - Validated configuration
/// * `items` - Identifiers to resolve
/// * `config_hash` - Hash of the configuration file, stored with the run
///
/// # Returns
///
/// * `Ok(Summary)` - The run finished (individual identifiers may have failed)
/// * `Err(ResolverError)` - Startup failed: store, HTTP client or browser pool
pub async fn run_batch(
    config: &Config,
    items: Vec<BatchItem>,
    config_hash: &str,
) -> Result<Summary, ResolverError> {
    let mut store = open_store(Path::new(&config.output.database_path))?;
    let run_id = store.create_run(config_hash)?;
    tracing::info!("Started run {}", run_id);

    let store = Arc::new(Mutex::new(store));
    let result = execute(config, items, Arc::clone(&store)).await;

    let status = match &result {
        Ok(_) => RunStatus::Completed,
        Err(_) => RunStatus::Failed,
    };
    if let Err(e) = store
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .complete_run(run_id, status)
    {
        tracing::warn!("Could not close run {}: {}", run_id, e);
    }

    result
}

async fn execute<S>(
    config: &Config,
    items: Vec<BatchItem>,
    store: Arc<Mutex<S>>,
) -> Result<Summary, ResolverError>
where
    S: ResultStore + Send + 'static,
{
    let client = build_http_client(&config.http)?;
    let limiter = Arc::new(RateLimiter::new(config.resolver.base_delay()));

    let factory =
        BrowserSessionFactory::new(config.browser.clone(), config.http.user_agents.first().cloned());
    let pool = Arc::new(
        SessionPool::initialize(factory, config.resolver.pool_size as usize, limiter).await?,
    );

    let counters = Arc::new(StrategyCounters::new());
    let resolvers = match build_resolvers(config, &client, &pool, &counters) {
        Ok(resolvers) => resolvers,
        Err(e) => {
            pool.shutdown().await;
            return Err(e);
        }
    };

    let driver = BatchDriver::new(
        resolvers,
        store,
        counters,
        DriverOptions::from_config(&config.resolver),
    );
    let summary = driver.run(items).await;

    if pool.overflow_created() > 0 {
        tracing::info!("{} overflow sessions were created", pool.overflow_created());
    }
    pool.shutdown().await;

    Ok(summary)
}

/// One resolver per worker, each with its own rate-limit identity
fn build_resolvers(
    config: &Config,
    client: &reqwest::Client,
    pool: &Arc<SessionPool<BrowserSessionFactory>>,
    counters: &Arc<StrategyCounters>,
) -> Result<Vec<Resolver>, ResolverError> {
    let options = ResolverOptions::from_config(&config.resolver);

    (0..config.resolver.workers)
        .map(|worker| -> Result<Resolver, ResolverError> {
            let sources = Sources::build(
                config,
                client.clone(),
                Arc::clone(pool),
                &format!("worker-{}", worker),
            )?;
            Ok(Resolver::new(sources, Arc::clone(counters), options.clone()))
        })
        .collect()
}
