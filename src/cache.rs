//! Content-addressed cache for derived waveforms.
//!
//! [`RecordCache`] wraps an abstract [`KeyValueStore`] and maps a
//! [`Fingerprint`] to a serialized derived [`Waveform`]. Entries carry no
//! TTL; they disappear only through explicit invalidation, typically when
//! an incident's source data changes.
//!
//! Two extra responsibilities beyond plain get/put:
//!
//! - **Single flight**: [`RecordCache::flight_gate`] hands out one mutex per
//!   fingerprint so concurrent requests for the identical fingerprint
//!   serialize on the compute step while distinct fingerprints proceed
//!   independently. Gates live for the process lifetime, like the entries
//!   themselves.
//! - **Record index**: every stored fingerprint is also appended to an index
//!   entry keyed by the source record, so [`RecordCache::invalidate_record`]
//!   can drop every derived series of a record in one call.
//!
//! Failure semantics: any backing-store failure surfaces as
//! [`GmError::CacheUnavailable`]. Callers treat read failures as a miss and
//! recompute; write failures are logged and never lose the computed result.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{GmError, GmResult};
use crate::fingerprint::Fingerprint;
use crate::store::KeyValueStore;
use crate::waveform::Waveform;

/// Serialized form of a cache entry: the waveform plus a provenance
/// timestamp. The timestamp is informational and takes no part in equality.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEnvelope {
    waveform: Waveform,
    stored_at: DateTime<Utc>,
}

/// A deduplicating cache of derived waveforms over a key-value store.
pub struct RecordCache {
    backend: Arc<dyn KeyValueStore>,
    gates: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RecordCache {
    /// Wraps the given backing store. The store is injected explicitly;
    /// there is no process-global cache.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend: store,
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Looks up a derived waveform. `Ok(None)` is a miss; `Err` means the
    /// backing store failed (callers should fall back to recomputing).
    pub fn lookup(&self, fp: &Fingerprint) -> GmResult<Option<Waveform>> {
        let bytes = self
            .backend
            .get(fp.as_bytes())
            .map_err(|e| GmError::CacheUnavailable(e.to_string()))?;
        match bytes {
            None => Ok(None),
            Some(bytes) => match serde_json::from_slice::<CacheEnvelope>(&bytes) {
                Ok(envelope) => Ok(Some(envelope.waveform)),
                // A corrupt entry is indistinguishable from an unavailable
                // one to the caller; recomputing will overwrite it.
                Err(e) => Err(GmError::CacheUnavailable(format!(
                    "corrupt entry for {fp}: {e}"
                ))),
            },
        }
    }

    /// Stores a derived waveform under `fp` and records the fingerprint in
    /// the index entry of `record_key`.
    ///
    /// The index entry is written before the waveform entry. A dangling
    /// index hex is a harmless lookup miss, but a cached entry missing from
    /// the index would survive [`RecordCache::invalidate_record`] and keep
    /// serving stale data after the source record changes.
    pub fn store(&self, fp: &Fingerprint, record_key: &str, waveform: &Waveform) -> GmResult<()> {
        let envelope = CacheEnvelope {
            waveform: waveform.clone(),
            stored_at: Utc::now(),
        };
        let bytes = serde_json::to_vec(&envelope)?;
        self.index_fingerprint(record_key, fp)?;
        self.backend
            .put(fp.as_bytes(), &bytes)
            .map_err(|e| GmError::CacheUnavailable(e.to_string()))?;
        log::debug!("cached {} bytes for {fp}", bytes.len());
        Ok(())
    }

    /// Drops a single entry. Invalidating a missing entry is not an error.
    pub fn invalidate(&self, fp: &Fingerprint) -> GmResult<()> {
        self.backend
            .delete(fp.as_bytes())
            .map_err(|e| GmError::CacheUnavailable(e.to_string()))
    }

    /// Drops every cached entry whose fingerprint derives from
    /// `record_key`, plus the index entry itself. Returns the number of
    /// entries removed.
    pub fn invalidate_record(&self, record_key: &str) -> GmResult<usize> {
        let fingerprints = self.read_index(record_key)?;
        for fp in &fingerprints {
            self.backend
                .delete(fp.as_bytes())
                .map_err(|e| GmError::CacheUnavailable(e.to_string()))?;
        }
        self.backend
            .delete(&index_key(record_key))
            .map_err(|e| GmError::CacheUnavailable(e.to_string()))?;
        log::info!(
            "invalidated {} cached entries for record '{record_key}'",
            fingerprints.len()
        );
        Ok(fingerprints.len())
    }

    /// The single-flight gate for `fp`. Callers lock the returned mutex
    /// around the lookup-compute-store sequence; a second caller for the
    /// same fingerprint blocks until the first result is stored, then
    /// observes it on its re-lookup.
    pub fn flight_gate(&self, fp: &Fingerprint) -> Arc<Mutex<()>> {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            gates
                .entry(fp.as_str().to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    fn read_index(&self, record_key: &str) -> GmResult<Vec<Fingerprint>> {
        let bytes = self
            .backend
            .get(&index_key(record_key))
            .map_err(|e| GmError::CacheUnavailable(e.to_string()))?;
        match bytes {
            None => Ok(Vec::new()),
            Some(bytes) => {
                let hexes: Vec<String> = serde_json::from_slice(&bytes)?;
                Ok(hexes.into_iter().map(Fingerprint::from_hex).collect())
            }
        }
    }

    fn index_fingerprint(&self, record_key: &str, fp: &Fingerprint) -> GmResult<()> {
        let mut hexes: Vec<String> = self
            .read_index(record_key)?
            .into_iter()
            .map(|f| f.as_str().to_string())
            .collect();
        if !hexes.iter().any(|h| h == fp.as_str()) {
            hexes.push(fp.as_str().to_string());
            let bytes = serde_json::to_vec(&hexes)?;
            self.backend
                .put(&index_key(record_key), &bytes)
                .map_err(|e| GmError::CacheUnavailable(e.to_string()))?;
        }
        Ok(())
    }
}

fn index_key(record_key: &str) -> Vec<u8> {
    format!("record-index/{record_key}").into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::waveform::UnitKind;

    fn cache() -> RecordCache {
        RecordCache::new(Arc::new(MemoryStore::new()))
    }

    fn waveform(seed: f64) -> Waveform {
        Waveform::new(vec![seed, seed * 2.0, seed * 3.0], 0.01, UnitKind::Velocity, None)
            .expect("valid waveform")
    }

    fn fp(tag: &str) -> Fingerprint {
        Fingerprint::from_hex(format!("{tag:0>64}"))
    }

    #[test]
    fn lookup_after_store_returns_equal_waveform() {
        let cache = cache();
        let w = waveform(1.0);
        let key = fp("a1");
        assert_eq!(cache.lookup(&key).expect("lookup"), None);
        cache.store(&key, "inc/st001/h1", &w).expect("store");
        assert_eq!(cache.lookup(&key).expect("lookup"), Some(w));
    }

    #[test]
    fn invalidate_removes_a_single_entry() {
        let cache = cache();
        let key = fp("b2");
        cache.store(&key, "inc/st001/h1", &waveform(1.0)).expect("store");
        cache.invalidate(&key).expect("invalidate");
        assert_eq!(cache.lookup(&key).expect("lookup"), None);
    }

    #[test]
    fn invalidate_record_drops_all_indexed_entries() {
        let cache = cache();
        let (k1, k2, other) = (fp("c1"), fp("c2"), fp("d1"));
        cache.store(&k1, "inc/st001/h1", &waveform(1.0)).expect("store");
        cache.store(&k2, "inc/st001/h1", &waveform(2.0)).expect("store");
        cache.store(&other, "inc/st002/h1", &waveform(3.0)).expect("store");

        let removed = cache.invalidate_record("inc/st001/h1").expect("invalidate");
        assert_eq!(removed, 2);
        assert_eq!(cache.lookup(&k1).expect("lookup"), None);
        assert_eq!(cache.lookup(&k2).expect("lookup"), None);
        // entries of other records are untouched
        assert!(cache.lookup(&other).expect("lookup").is_some());
    }

    #[test]
    fn restoring_the_same_fingerprint_does_not_duplicate_the_index() {
        let cache = cache();
        let key = fp("e1");
        cache.store(&key, "inc/st001/h1", &waveform(1.0)).expect("store");
        cache.store(&key, "inc/st001/h1", &waveform(1.5)).expect("store");
        assert_eq!(cache.invalidate_record("inc/st001/h1").expect("invalidate"), 1);
    }

    #[test]
    fn flight_gate_is_shared_per_fingerprint() {
        let cache = cache();
        let g1 = cache.flight_gate(&fp("f1"));
        let g2 = cache.flight_gate(&fp("f1"));
        let g3 = cache.flight_gate(&fp("f2"));
        assert!(Arc::ptr_eq(&g1, &g2));
        assert!(!Arc::ptr_eq(&g1, &g3));
    }
}
