//! Batch driver persistence behavior against an in-memory store

use crate::support::{sources, FakeCatalog, FakeSearch};
use async_trait::async_trait;
use device_resolver::batch::{parse_batch_items, BatchDriver, DriverOptions};
use device_resolver::record::{
    BatchItem, FailureRecord, Identifier, PartialRecord, Resolution, ResolvedRecord,
};
use device_resolver::resolver::{Resolve, Resolver, ResolverOptions, StrategyCounters};
use device_resolver::storage::{
    ResultStore, RunRecord, RunStatus, SqliteStore, StorageError, StorageResult,
};
use device_resolver::{Brand, Method};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Resolves identifiers listed in `known`, fails everything else
#[derive(Default)]
struct StubResolver {
    known: HashSet<String>,
    calls: Arc<AtomicUsize>,
    /// When set, every identifier resolves
    resolve_all: Arc<AtomicBool>,
}

impl StubResolver {
    fn knowing(codes: &[&str]) -> Self {
        Self {
            known: codes.iter().map(|c| c.to_string()).collect(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl Resolve for StubResolver {
    async fn resolve(&self, item: &BatchItem) -> Resolution {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let code = item.identifier.as_str();

        if self.resolve_all.load(Ordering::SeqCst) || self.known.contains(code) {
            Resolution::Resolved(resolved(&item.identifier, &format!("Device {}", code)))
        } else {
            Resolution::Failed(FailureRecord::new(
                item.identifier.clone(),
                "gsmarena_direct: Not found",
            ))
        }
    }
}

fn resolved(identifier: &Identifier, name: &str) -> ResolvedRecord {
    let mut partial = PartialRecord::new("gsmarena", "arena://device.php");
    partial.device_name = name.to_string();
    partial.announced_date = "2022, May 1".to_string();
    ResolvedRecord::from_partial(identifier.clone(), partial, Brand::Unknown, Method::Direct)
}

/// In-memory store whose next `failures` record writes are refused
struct FlakyStore {
    inner: SqliteStore,
    failures: usize,
    attempts: usize,
}

impl FlakyStore {
    fn failing(failures: usize) -> Self {
        Self {
            inner: SqliteStore::new_in_memory().unwrap(),
            failures,
            attempts: 0,
        }
    }

    fn refuse(&mut self) -> StorageResult<()> {
        self.attempts += 1;
        if self.failures > 0 {
            self.failures -= 1;
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )));
        }
        Ok(())
    }
}

impl ResultStore for FlakyStore {
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        self.inner.create_run(config_hash)
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.inner.get_run(run_id)
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        self.inner.get_latest_run()
    }

    fn complete_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        self.inner.complete_run(run_id, status)
    }

    fn upsert_resolved(&mut self, record: &ResolvedRecord) -> StorageResult<bool> {
        self.refuse()?;
        self.inner.upsert_resolved(record)
    }

    fn append_failure(&mut self, record: &FailureRecord) -> StorageResult<bool> {
        self.refuse()?;
        self.inner.append_failure(record)
    }

    fn get_resolved(&self, identifier: &Identifier) -> StorageResult<Option<ResolvedRecord>> {
        self.inner.get_resolved(identifier)
    }

    fn get_failure(&self, identifier: &Identifier) -> StorageResult<Option<FailureRecord>> {
        self.inner.get_failure(identifier)
    }

    fn is_resolved(&self, identifier: &Identifier) -> StorageResult<bool> {
        self.inner.is_resolved(identifier)
    }

    fn count_resolved(&self) -> StorageResult<u64> {
        self.inner.count_resolved()
    }

    fn count_failed(&self) -> StorageResult<u64> {
        self.inner.count_failed()
    }

    fn count_by_method(&self) -> StorageResult<BTreeMap<String, u64>> {
        self.inner.count_by_method()
    }

    fn list_resolved(&self) -> StorageResult<Vec<ResolvedRecord>> {
        self.inner.list_resolved()
    }

    fn list_failures(&self) -> StorageResult<Vec<FailureRecord>> {
        self.inner.list_failures()
    }
}

fn options() -> DriverOptions {
    DriverOptions {
        base_delay: Duration::ZERO,
        per_item_limit: None,
        skip_resolved: true,
    }
}

fn store() -> Arc<Mutex<SqliteStore>> {
    Arc::new(Mutex::new(SqliteStore::new_in_memory().unwrap()))
}

fn items(codes: &[&str]) -> Vec<BatchItem> {
    parse_batch_items(&codes.join("\n")).unwrap()
}

fn id(code: &str) -> Identifier {
    Identifier::parse(code).unwrap()
}

#[tokio::test]
async fn test_every_identifier_gets_exactly_one_record() {
    let store = store();
    let driver = BatchDriver::new(
        vec![StubResolver::knowing(&["SM-A245F", "CPH2471"])],
        Arc::clone(&store),
        Arc::new(StrategyCounters::new()),
        options(),
    );

    let summary = driver
        .run(items(&["SM-A245F", "ZX-404", "CPH2471", "ZX-405"]))
        .await;

    assert_eq!(summary.total, 4);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.write_failures, 0);

    let store = store.lock().unwrap();
    assert_eq!(store.count_resolved().unwrap(), 2);
    assert_eq!(store.count_failed().unwrap(), 2);

    for code in ["SM-A245F", "CPH2471"] {
        assert!(store.get_resolved(&id(code)).unwrap().is_some());
        assert!(store.get_failure(&id(code)).unwrap().is_none());
    }
    for code in ["ZX-404", "ZX-405"] {
        assert!(store.get_resolved(&id(code)).unwrap().is_none());
        let failure = store.get_failure(&id(code)).unwrap().unwrap();
        assert_eq!(failure.reason, "gsmarena_direct: Not found");
    }
}

#[tokio::test]
async fn test_rerun_skips_resolved_identifiers() {
    let store = store();
    let first = StubResolver::knowing(&["SM-A245F"]);
    let calls = Arc::clone(&first.calls);
    let driver = BatchDriver::new(
        vec![first],
        Arc::clone(&store),
        Arc::new(StrategyCounters::new()),
        options(),
    );

    driver.run(items(&["SM-A245F", "ZX-404"])).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let summary = driver.run(items(&["SM-A245F", "ZX-404"])).await;

    // Only the failed identifier is retried
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 1);

    let store = store.lock().unwrap();
    assert_eq!(store.count_resolved().unwrap(), 1);
    assert_eq!(store.count_failed().unwrap(), 1);
}

#[tokio::test]
async fn test_later_success_replaces_failure() {
    let store = store();
    let resolver = StubResolver::default();
    let resolve_all = Arc::clone(&resolver.resolve_all);
    let driver = BatchDriver::new(
        vec![resolver],
        Arc::clone(&store),
        Arc::new(StrategyCounters::new()),
        options(),
    );

    driver.run(items(&["V2111"])).await;
    assert!(store.lock().unwrap().get_failure(&id("V2111")).unwrap().is_some());

    resolve_all.store(true, Ordering::SeqCst);
    let summary = driver.run(items(&["V2111"])).await;
    assert_eq!(summary.succeeded, 1);

    let store = store.lock().unwrap();
    assert!(store.get_failure(&id("V2111")).unwrap().is_none());
    assert_eq!(
        store.get_resolved(&id("V2111")).unwrap().unwrap().device_name,
        "Device V2111"
    );
}

#[tokio::test]
async fn test_resolved_record_is_never_overwritten() {
    let store = store();
    store
        .lock()
        .unwrap()
        .upsert_resolved(&resolved(&id("CPH2269"), "Oppo Reno7"))
        .unwrap();

    let driver = BatchDriver::new(
        vec![StubResolver::knowing(&["CPH2269"])],
        Arc::clone(&store),
        Arc::new(StrategyCounters::new()),
        DriverOptions {
            skip_resolved: false,
            ..options()
        },
    );
    let summary = driver.run(items(&["CPH2269"])).await;

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.write_failures, 0);

    let store = store.lock().unwrap();
    assert_eq!(store.count_resolved().unwrap(), 1);
    assert_eq!(
        store.get_resolved(&id("CPH2269")).unwrap().unwrap().device_name,
        "Oppo Reno7"
    );
}

#[tokio::test]
async fn test_limit_and_duplicates() {
    let store = store();
    let resolver = StubResolver::default();
    let calls = Arc::clone(&resolver.calls);
    let driver = BatchDriver::new(
        vec![resolver],
        Arc::clone(&store),
        Arc::new(StrategyCounters::new()),
        DriverOptions {
            per_item_limit: Some(2),
            ..options()
        },
    );

    let mut batch = items(&["CPH1931", "CPH2387"]);
    batch.push(BatchItem::new(id("cph1931")));
    batch.extend(items(&["CPH2471"]));

    let summary = driver.run(batch).await;

    assert_eq!(summary.total, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let store = store.lock().unwrap();
    assert!(store.get_failure(&id("CPH2471")).unwrap().is_none());
}

#[tokio::test]
async fn test_parallel_workers_write_every_item_once() {
    let store = store();
    let codes: Vec<String> = (0..12).map(|i| format!("ZX-{}", i)).collect();
    let known: Vec<&str> = codes.iter().step_by(2).map(String::as_str).collect();

    let resolvers = (0..3).map(|_| StubResolver::knowing(&known)).collect();
    let driver = BatchDriver::new(
        resolvers,
        Arc::clone(&store),
        Arc::new(StrategyCounters::new()),
        options(),
    );
    assert_eq!(driver.workers(), 3);

    let refs: Vec<&str> = codes.iter().map(String::as_str).collect();
    let summary = driver.run(items(&refs)).await;

    assert_eq!(summary.succeeded, 6);
    assert_eq!(summary.failed, 6);

    let store = store.lock().unwrap();
    assert_eq!(store.count_resolved().unwrap(), 6);
    assert_eq!(store.count_failed().unwrap(), 6);
}

#[tokio::test]
async fn test_resolver_results_are_persisted_end_to_end() {
    let secondary = FakeCatalog::new("gsmchoice")
        .identifier("ZX-100", "Acme ZX100", "choice://acme-zx100")
        .detail("choice://acme-zx100", "Acme ZX100", "2021, March 3", "");
    let primary = FakeCatalog::new("gsmarena")
        .name("Acme ZX100", "Acme ZX100", "arena://acme_zx100-1.php")
        .detail("arena://acme_zx100-1.php", "Acme ZX100", "", "About 150 EUR");

    let counters = Arc::new(StrategyCounters::new());
    let resolver = Resolver::new(
        sources(primary, secondary, FakeSearch::empty()),
        Arc::clone(&counters),
        ResolverOptions::default(),
    );

    let store = store();
    let driver = BatchDriver::new(vec![resolver], Arc::clone(&store), Arc::clone(&counters), options());
    let summary = driver.run(items(&["ZX-100", "ZX-999"])).await;

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.web_searches, 2);
    assert_eq!(summary.per_strategy[&Method::NameResolution].hits, 1);

    let store = store.lock().unwrap();
    let record = store.get_resolved(&id("ZX-100")).unwrap().unwrap();
    assert_eq!(record.device_name, "Acme ZX100");
    assert_eq!(record.method_used, Method::NameResolution);
    assert_eq!(record.announced_date, "2021, March 3");
    assert_eq!(record.announced_date_source, "gsmchoice");

    let by_method = store.count_by_method().unwrap();
    assert_eq!(by_method.get("gsmchoice_gsmarena"), Some(&1));
    assert!(store.get_failure(&id("ZX-999")).unwrap().is_some());
}

#[tokio::test]
async fn test_single_write_failure_is_retried() {
    let store = Arc::new(Mutex::new(FlakyStore::failing(1)));
    let driver = BatchDriver::new(
        vec![StubResolver::knowing(&["SM-A245F"])],
        Arc::clone(&store),
        Arc::new(StrategyCounters::new()),
        options(),
    );

    let summary = driver.run(items(&["SM-A245F"])).await;

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.write_failures, 0);

    let store = store.lock().unwrap();
    assert_eq!(store.attempts, 2);
    assert_eq!(store.count_resolved().unwrap(), 1);
}

#[tokio::test]
async fn test_second_write_failure_only_loses_that_item() {
    let store = Arc::new(Mutex::new(FlakyStore::failing(2)));
    let resolver = StubResolver::knowing(&["SM-A245F", "CPH2471"]);
    let calls = Arc::clone(&resolver.calls);
    let driver = BatchDriver::new(
        vec![resolver],
        Arc::clone(&store),
        Arc::new(StrategyCounters::new()),
        options(),
    );

    let summary = driver.run(items(&["SM-A245F", "CPH2471"])).await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.write_failures, 1);

    let store = store.lock().unwrap();
    assert!(store.get_resolved(&id("SM-A245F")).unwrap().is_none());
    assert!(store.get_failure(&id("SM-A245F")).unwrap().is_none());
    assert!(store.get_resolved(&id("CPH2471")).unwrap().is_some());
    assert_eq!(store.count_resolved().unwrap(), 1);
}
