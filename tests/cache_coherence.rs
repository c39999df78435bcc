//! Cache behavior across backends and degraded stores.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use groundmotion::cache::RecordCache;
use groundmotion::config::Settings;
use groundmotion::descriptor::Operation;
use groundmotion::fingerprint::Fingerprint;
use groundmotion::resolver::{RecordRequest, RecordResolver, TableLoader};
use groundmotion::store::{DiskStore, KeyValueStore, MemoryStore, StoreError};
use groundmotion::waveform::{Component, UnitKind, Waveform};
use groundmotion::RecordRef;

fn record(station: &str) -> RecordRef {
    RecordRef {
        incident: "ridgecrest-obs".into(),
        station: station.into(),
        component: Component::Vertical,
    }
}

fn waveform(samples: Vec<f64>) -> Waveform {
    Waveform::new(samples, 0.01, UnitKind::Velocity, None).expect("valid waveform")
}

fn fp(tag: &str) -> Fingerprint {
    Fingerprint::from_hex(format!("{tag:0>64}"))
}

#[test]
fn disk_backed_cache_survives_a_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let key = fp("ab");
    let w = waveform(vec![0.0, 0.5, 1.0]);

    {
        let store = Arc::new(DiskStore::open(dir.path()).expect("open"));
        let cache = RecordCache::new(store);
        cache.store(&key, "inc/st001/ver", &w).expect("store");
    }

    let store = Arc::new(DiskStore::open(dir.path()).expect("reopen"));
    let cache = RecordCache::new(store);
    assert_eq!(cache.lookup(&key).expect("lookup"), Some(w));

    // record-level invalidation also works across the reopen
    assert_eq!(cache.invalidate_record("inc/st001/ver").expect("invalidate"), 1);
    assert_eq!(cache.lookup(&key).expect("lookup"), None);
}

/// A store that can be switched into a failing mode, for exercising the
/// degraded-cache paths.
struct FlakyStore {
    inner: MemoryStore,
    failing: AtomicBool,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            failing: AtomicBool::new(false),
        }
    }

    fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError("backend offline".into()))
        } else {
            Ok(())
        }
    }
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        self.check()?;
        self.inner.get(key)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.check()?;
        self.inner.put(key, value)
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        self.check()?;
        self.inner.delete(key)
    }
}

#[test]
fn store_outage_degrades_to_recomputation_without_failing_requests() {
    let _ = env_logger::builder().is_test(true).try_init();

    let loader = Arc::new(TableLoader::new());
    let rec = record("st001");
    loader.insert(
        &rec,
        Waveform::new(
            vec![0.0, 1.0, 2.0, 1.0, 0.0, -1.0, -2.0, -1.0, 0.0],
            0.01,
            UnitKind::Acceleration,
            Some(Component::Vertical),
        )
        .expect("valid waveform"),
    );
    let flaky = Arc::new(FlakyStore::new());
    let cache = Arc::new(RecordCache::new(flaky.clone()));
    let resolver = RecordResolver::new(loader, cache, Settings::default());

    let request = RecordRequest {
        record: rec,
        target: UnitKind::Velocity,
        steps: vec![Operation::Lowpass {
            corner_hz: 5.0,
            order: 2,
        }],
    };

    // Healthy store: computed once, then cached.
    let healthy = resolver.resolve(&request).expect("resolve");
    assert_eq!(resolver.engine_invocations(), 1);

    // Outage: reads and writes fail, but the caller still gets the
    // freshly computed waveform.
    flaky.set_failing(true);
    let degraded = resolver.resolve(&request).expect("resolve during outage");
    assert_eq!(degraded, healthy);
    assert_eq!(
        resolver.engine_invocations(),
        2,
        "outage read must degrade to a recompute"
    );

    // Recovery: the earlier successful store still serves hits.
    flaky.set_failing(false);
    let recovered = resolver.resolve(&request).expect("resolve after recovery");
    assert_eq!(recovered, healthy);
    assert_eq!(resolver.engine_invocations(), 2);
}

/// A store that rejects writes of record-index entries but serves
/// everything else, for exercising a partially failing backend.
struct IndexWriteFailingStore {
    inner: MemoryStore,
}

impl IndexWriteFailingStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
        }
    }
}

impl KeyValueStore for IndexWriteFailingStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        self.inner.get(key)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        if key.starts_with(b"record-index/") {
            return Err(StoreError("index partition offline".into()));
        }
        self.inner.put(key, value)
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        self.inner.delete(key)
    }
}

#[test]
fn failed_index_write_leaves_no_unindexed_entry() {
    let cache = RecordCache::new(Arc::new(IndexWriteFailingStore::new()));
    let key = fp("9f");

    assert!(cache.store(&key, "inc/st001/ver", &waveform(vec![1.0])).is_err());
    // The waveform entry must not exist either; an entry without an index
    // record could never be removed by record-level invalidation.
    assert_eq!(cache.lookup(&key).expect("lookup"), None);
}

#[test]
fn record_invalidation_is_not_defeated_by_index_write_failures() {
    let _ = env_logger::builder().is_test(true).try_init();

    let loader = Arc::new(TableLoader::new());
    let rec = record("st002");
    loader.insert(
        &rec,
        Waveform::new(
            vec![0.0, 1.0, 2.0, 1.0, 0.0],
            0.01,
            UnitKind::Acceleration,
            Some(Component::Vertical),
        )
        .expect("valid waveform"),
    );
    let cache = Arc::new(RecordCache::new(Arc::new(IndexWriteFailingStore::new())));
    let resolver = RecordResolver::new(loader.clone(), cache, Settings::default());

    let request = RecordRequest {
        record: rec.clone(),
        target: UnitKind::Velocity,
        steps: Vec::new(),
    };

    let first = resolver.resolve(&request).expect("resolve");
    assert_eq!(resolver.engine_invocations(), 1);

    // The source record changes; everything derived from it is dropped.
    loader.insert(
        &rec,
        Waveform::new(
            vec![0.0, 2.0, 4.0, 2.0, 0.0],
            0.01,
            UnitKind::Acceleration,
            Some(Component::Vertical),
        )
        .expect("valid waveform"),
    );
    resolver.invalidate_record(&rec).expect("invalidate");

    let second = resolver.resolve(&request).expect("resolve after invalidation");
    assert_eq!(
        resolver.engine_invocations(),
        2,
        "post-invalidation resolve must recompute"
    );
    assert_ne!(second.samples(), first.samples(), "stale samples were served");
}

#[test]
fn invalidating_one_fingerprint_leaves_others_intact() {
    let store = Arc::new(MemoryStore::new());
    let cache = RecordCache::new(store);
    let (k1, k2) = (fp("01"), fp("02"));
    cache.store(&k1, "inc/st001/ver", &waveform(vec![1.0])).expect("store");
    cache.store(&k2, "inc/st001/ver", &waveform(vec![2.0])).expect("store");

    cache.invalidate(&k1).expect("invalidate");
    assert_eq!(cache.lookup(&k1).expect("lookup"), None);
    assert!(cache.lookup(&k2).expect("lookup").is_some());
}
