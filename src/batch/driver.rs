//! Batch driver
//!
//! Feeds batch items to resolvers and writes every terminal record before
//! the worker moves on. With a single worker items are processed serially in
//! the calling task; otherwise each worker is a task on a `JoinSet` pulling
//! from a shared queue.

use super::summary::Summary;
use crate::config::ResolverConfig;
use crate::record::{BatchItem, Resolution};
use crate::resolver::{Resolve, StrategyCounters};
use crate::storage::{ResultStore, StorageResult};
use rand::Rng;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

#[derive(Debug, Clone)]
pub struct DriverOptions {
    /// Centre of the pause between two items of one worker
    pub base_delay: Duration,
    pub per_item_limit: Option<usize>,
    pub skip_resolved: bool,
}

impl DriverOptions {
    pub fn from_config(config: &ResolverConfig) -> Self {
        Self {
            base_delay: config.base_delay(),
            per_item_limit: config.per_item_limit,
            skip_resolved: config.skip_resolved,
        }
    }
}

/// Pause between items, uniform in `[0.8, 1.5] x base`
pub fn jitter(base: Duration) -> Duration {
    let factor = rand::thread_rng().gen_range(0.8..=1.5);
    base.mul_f64(factor)
}

/// What one worker did
#[derive(Debug, Default)]
struct WorkerTally {
    succeeded: usize,
    failed: usize,
    write_failures: usize,
}

type Queue = Arc<Mutex<VecDeque<(usize, BatchItem)>>>;

pub struct BatchDriver<R, S> {
    /// One resolver per worker
    resolvers: Vec<Arc<R>>,
    store: Arc<Mutex<S>>,
    counters: Arc<StrategyCounters>,
    options: DriverOptions,
}

impl<R, S> BatchDriver<R, S>
where
    R: Resolve + 'static,
    S: ResultStore + Send + 'static,
{
    pub fn new(
        resolvers: Vec<R>,
        store: Arc<Mutex<S>>,
        counters: Arc<StrategyCounters>,
        options: DriverOptions,
    ) -> Self {
        Self {
            resolvers: resolvers.into_iter().map(Arc::new).collect(),
            store,
            counters,
            options,
        }
    }

    pub fn workers(&self) -> usize {
        self.resolvers.len()
    }

    /// Resolves every item and returns the run summary
    pub async fn run(&self, items: Vec<BatchItem>) -> Summary {
        let started = Instant::now();
        let items = self.prepare(items);

        let mut summary = Summary {
            total: items.len(),
            ..Summary::default()
        };

        let pending: VecDeque<(usize, BatchItem)> = items
            .into_iter()
            .enumerate()
            .filter(|(_, item)| {
                let skip = self.options.skip_resolved && self.already_resolved(item);
                if skip {
                    tracing::info!("{} already resolved, skipping", item.identifier);
                }
                !skip
            })
            .map(|(index, item)| (index + 1, item))
            .collect();
        summary.skipped = summary.total - pending.len();

        tracing::info!(
            "Resolving {} identifiers with {} worker(s) ({} skipped)",
            pending.len(),
            self.workers(),
            summary.skipped
        );

        let queue: Queue = Arc::new(Mutex::new(pending));
        let total = summary.total;

        let tallies = if self.resolvers.len() <= 1 {
            match self.resolvers.first() {
                Some(resolver) => vec![
                    work(
                        0,
                        Arc::clone(resolver),
                        Arc::clone(&queue),
                        Arc::clone(&self.store),
                        self.options.base_delay,
                        total,
                    )
                    .await,
                ],
                None => {
                    tracing::warn!("No resolvers available, nothing processed");
                    Vec::new()
                }
            }
        } else {
            let mut workers = JoinSet::new();
            for (index, resolver) in self.resolvers.iter().enumerate() {
                workers.spawn(work(
                    index,
                    Arc::clone(resolver),
                    Arc::clone(&queue),
                    Arc::clone(&self.store),
                    self.options.base_delay,
                    total,
                ));
            }

            let mut tallies = Vec::new();
            while let Some(joined) = workers.join_next().await {
                match joined {
                    Ok(tally) => tallies.push(tally),
                    Err(e) => tracing::error!("Worker task failed: {}", e),
                }
            }
            tallies
        };

        for tally in tallies {
            summary.succeeded += tally.succeeded;
            summary.failed += tally.failed;
            summary.write_failures += tally.write_failures;
        }

        summary.record_counters(&self.counters);
        summary.elapsed = started.elapsed();
        summary
    }

    /// De-duplicates (first occurrence wins) and applies the per-item limit
    fn prepare(&self, items: Vec<BatchItem>) -> Vec<BatchItem> {
        let mut seen = HashSet::new();
        let mut items: Vec<BatchItem> = items
            .into_iter()
            .filter(|item| seen.insert(item.identifier.clone()))
            .collect();

        if let Some(limit) = self.options.per_item_limit {
            if items.len() > limit {
                tracing::info!("Limiting batch to {} of {} identifiers", limit, items.len());
                items.truncate(limit);
            }
        }
        items
    }

    fn already_resolved(&self, item: &BatchItem) -> bool {
        let store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        match store.is_resolved(&item.identifier) {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::warn!("Could not check {} in store: {}", item.identifier, e);
                false
            }
        }
    }
}

/// One worker: pull, resolve, persist, pause, repeat
async fn work<R, S>(
    worker: usize,
    resolver: Arc<R>,
    queue: Queue,
    store: Arc<Mutex<S>>,
    base_delay: Duration,
    total: usize,
) -> WorkerTally
where
    R: Resolve + 'static,
    S: ResultStore + Send + 'static,
{
    let mut tally = WorkerTally::default();

    loop {
        let next = queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let Some((position, item)) = next else {
            break;
        };

        let resolution = resolver.resolve(&item).await;
        match &resolution {
            Resolution::Resolved(record) => {
                tally.succeeded += 1;
                tracing::info!(
                    "[{}/{}] {} -> {} ({})",
                    position,
                    total,
                    item.identifier,
                    record.device_name,
                    record.method_used
                );
            }
            Resolution::Failed(record) => {
                tally.failed += 1;
                tracing::info!(
                    "[{}/{}] {} -> failed: {}",
                    position,
                    total,
                    item.identifier,
                    record.reason
                );
            }
        }

        if !persist_with_retry(&store, &resolution) {
            tally.write_failures += 1;
        }

        let more = !queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty();
        if more && !base_delay.is_zero() {
            let pause = jitter(base_delay);
            tracing::trace!("Worker {} pausing {:?}", worker, pause);
            tokio::time::sleep(pause).await;
        }
    }

    tally
}

fn persist<S: ResultStore>(store: &Mutex<S>, resolution: &Resolution) -> StorageResult<bool> {
    let mut store = store.lock().unwrap_or_else(PoisonError::into_inner);
    match resolution {
        Resolution::Resolved(record) => store.upsert_resolved(record),
        Resolution::Failed(record) => store.append_failure(record),
    }
}

/// Writes a terminal record, retrying once
///
/// Returns `false` if both attempts failed.
fn persist_with_retry<S: ResultStore>(store: &Mutex<S>, resolution: &Resolution) -> bool {
    let identifier = resolution.identifier();

    match persist(store, resolution) {
        Ok(_) => return true,
        Err(e) => tracing::warn!("Write for {} failed, retrying: {}", identifier, e),
    }

    match persist(store, resolution) {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!("Write for {} failed again, giving up: {}", identifier, e);
            false
        }
    }
}
