//! Run summaries and store statistics

use crate::record::FailureRecord;
use crate::resolver::{Method, StrategyCounters, StrategyTally};
use crate::storage::{ResultStore, RunRecord, StorageResult};
use std::collections::BTreeMap;
use std::time::Duration;

/// Number of failures listed by `print_statistics`
const RECENT_FAILURES: usize = 10;

/// Outcome of one batch run
#[derive(Debug, Clone, Default)]
pub struct Summary {
    /// Items after de-duplication and the per-item limit
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,

    /// Already resolved in the store before this run
    pub skipped: usize,

    /// Items whose terminal record could not be written
    pub write_failures: usize,

    pub per_strategy: BTreeMap<Method, StrategyTally>,
    pub web_searches: u64,
    pub secondary_lookups: u64,
    pub date_enrichments: u64,
    pub elapsed: Duration,
}

impl Summary {
    /// Copies the strategy counters into the summary
    pub fn record_counters(&mut self, counters: &StrategyCounters) {
        self.per_strategy = counters.snapshot();
        self.web_searches = counters.web_searches();
        self.secondary_lookups = counters.secondary_lookups();
        self.date_enrichments = counters.date_enrichments();
    }

    /// Share of processed (not skipped) items that resolved, in percent
    pub fn success_rate(&self) -> f64 {
        let processed = self.succeeded + self.failed;
        if processed == 0 {
            0.0
        } else {
            self.succeeded as f64 / processed as f64 * 100.0
        }
    }
}

/// Prints a run summary to stdout
pub fn print_summary(summary: &Summary) {
    println!("=== Resolution Summary ===\n");

    println!("Overview:");
    println!("  Total identifiers: {}", summary.total);
    println!("  Resolved: {}", summary.succeeded);
    println!("  Failed: {}", summary.failed);
    println!("  Skipped (already resolved): {}", summary.skipped);
    if summary.write_failures > 0 {
        println!("  Write failures: {}", summary.write_failures);
    }
    println!("  Success rate: {:.1}%", summary.success_rate());
    println!("  Elapsed: {:.1}s", summary.elapsed.as_secs_f64());
    println!();

    println!("Strategies:");
    println!("  {:<24} {:>9} {:>6} {:>8}", "method", "attempts", "hits", "rate");
    for (method, tally) in &summary.per_strategy {
        println!(
            "  {:<24} {:>9} {:>6} {:>7.1}%",
            method.as_tag(),
            tally.attempts,
            tally.hits,
            tally.hit_rate() * 100.0
        );
    }
    println!();

    println!("Lookups:");
    println!("  Web searches: {}", summary.web_searches);
    println!("  Secondary catalog lookups: {}", summary.secondary_lookups);
    println!("  Dates filled from secondary catalog: {}", summary.date_enrichments);
}

/// Totals read back from the result store
#[derive(Debug, Clone)]
pub struct StoreStatistics {
    pub resolved: u64,
    pub failed: u64,
    pub by_method: BTreeMap<String, u64>,
    pub recent_failures: Vec<FailureRecord>,
    pub latest_run: Option<RunRecord>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `store` - The store to query
pub fn load_statistics(store: &dyn ResultStore) -> StorageResult<StoreStatistics> {
    let mut recent_failures = store.list_failures()?;
    recent_failures.truncate(RECENT_FAILURES);

    Ok(StoreStatistics {
        resolved: store.count_resolved()?,
        failed: store.count_failed()?,
        by_method: store.count_by_method()?,
        recent_failures,
        latest_run: store.get_latest_run()?,
    })
}

/// Prints store statistics to stdout
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Store Statistics ===\n");

    let total = stats.resolved + stats.failed;
    println!("Overview:");
    println!("  Identifiers stored: {}", total);
    println!("  Resolved: {}", stats.resolved);
    println!("  Failed: {}", stats.failed);
    println!();

    if !stats.by_method.is_empty() {
        println!("Resolved by Method:");
        let mut counts: Vec<_> = stats.by_method.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(a.1));

        for (method, count) in counts {
            let percentage = if stats.resolved > 0 {
                (*count as f64 / stats.resolved as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", method, count, percentage);
        }
        println!();
    }

    if !stats.recent_failures.is_empty() {
        println!("Recent Failures:");
        for failure in &stats.recent_failures {
            println!("  - {}: {}", failure.identifier, failure.reason);
        }
        println!();
    }

    match &stats.latest_run {
        Some(run) => {
            println!("Latest Run:");
            println!("  ID: {}", run.id);
            println!("  Started: {}", run.started_at);
            println!(
                "  Finished: {}",
                run.finished_at.as_deref().unwrap_or("(not finished)")
            );
            println!("  Status: {}", run.status);
        }
        None => println!("No runs recorded yet."),
    }
}
