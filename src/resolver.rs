//! The record resolver: public entry point of the pipeline.
//!
//! [`RecordResolver::resolve`] turns a [`RecordRequest`] into a concrete
//! [`Waveform`] through five stages:
//!
//! - **Descriptor build**: probe the record's native unit kind and sample
//!   interval, plan the implied conversion steps toward the requested
//!   representation, and validate the caller's chain. Invalid chains fail
//!   here, before any sample is loaded.
//! - **Fingerprint**: hash record identity + canonical descriptor +
//!   target unit.
//! - **Cache check**: a hit returns the stored waveform; a backing-store
//!   failure logs a warning and degrades to a miss.
//! - **Compute**: load the raw waveform and apply the steps in order
//!   through the transform engine, inside the fingerprint's single-flight
//!   gate so concurrent identical requests compute at most once.
//! - **Persist and return**: attempt the store; the computed waveform is
//!   returned to the caller even if persisting failed.
//!
//! All collaborators are injected explicitly; there is no global project
//! state. An atomic counter of transform-engine invocations is exposed so
//! tests (and callers) can observe deduplication.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::cache::RecordCache;
use crate::config::Settings;
use crate::descriptor::{Operation, OperationDescriptor};
use crate::error::{GmError, GmResult};
use crate::fingerprint::fingerprint;
use crate::transform;
use crate::waveform::{Component, UnitKind, Waveform};

/// Identity of a source record: one component of one station within one
/// registered incident.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordRef {
    /// Incident (earthquake scenario) name.
    pub incident: String,
    /// Station identifier within the incident.
    pub station: String,
    /// Recording component.
    pub component: Component,
}

impl RecordRef {
    /// Stable identity key used in fingerprints and the cache record index.
    pub fn key(&self) -> String {
        format!("{}/{}/{}", self.incident, self.station, self.component.tag())
    }
}

/// Metadata a loader can supply without reading sample data.
#[derive(Debug, Clone, Copy)]
pub struct RecordProbe {
    /// Unit kind of the stored raw series.
    pub native_unit: UnitKind,
    /// Sample interval of the stored raw series, in seconds.
    pub sample_interval: f64,
}

/// External collaborator supplying raw waveforms.
pub trait RecordLoader: Send + Sync {
    /// Returns the record's native unit kind and sample interval without
    /// loading samples. Missing records fail with [`GmError::NotFound`].
    fn probe(&self, record: &RecordRef) -> GmResult<RecordProbe>;

    /// Loads the raw waveform for the record.
    fn load_raw(&self, record: &RecordRef) -> GmResult<Waveform>;
}

/// A single resolution request. Constructed per query and never persisted;
/// only its resolved waveform may be cached.
#[derive(Debug, Clone)]
pub struct RecordRequest {
    /// The source record.
    pub record: RecordRef,
    /// Requested representation of the record before `steps` apply.
    pub target: UnitKind,
    /// Processing steps to apply on top of the target representation,
    /// in order.
    pub steps: Vec<Operation>,
}

/// Orchestrates descriptor build, fingerprinting, cache access, and the
/// transform engine.
pub struct RecordResolver {
    loader: Arc<dyn RecordLoader>,
    cache: Arc<RecordCache>,
    settings: Settings,
    engine_invocations: AtomicU64,
}

impl RecordResolver {
    /// Builds a resolver from explicitly injected collaborators.
    pub fn new(loader: Arc<dyn RecordLoader>, cache: Arc<RecordCache>, settings: Settings) -> Self {
        Self {
            loader,
            cache,
            settings,
            engine_invocations: AtomicU64::new(0),
        }
    }

    /// Resolves a request to a waveform. See the module docs for the stage
    /// sequence and failure semantics.
    pub fn resolve(&self, request: &RecordRequest) -> GmResult<Waveform> {
        // Stage 1: descriptor build and validation.
        let probe = self.loader.probe(&request.record)?;
        let plan = conversion_plan(
            probe.native_unit,
            request.target,
            self.settings.processing.raw_gain,
        )?;
        // Validate the caller's steps on their own first so a failure
        // reports the offending index of the *requested* chain, not of the
        // internally extended one.
        OperationDescriptor::new(request.steps.clone())
            .validate(request.target, probe.sample_interval)?;
        let mut steps = plan;
        steps.extend(request.steps.iter().cloned());
        let descriptor = OperationDescriptor::new(steps);
        descriptor.validate(probe.native_unit, probe.sample_interval)?;

        // Stage 2: fingerprint.
        let record_key = request.record.key();
        let fp = fingerprint(&record_key, &descriptor, request.target)?;

        // Stage 3: cache check. Store failures degrade to a miss.
        match self.cache.lookup(&fp) {
            Ok(Some(hit)) => {
                log::debug!("cache hit for {record_key} ({fp})");
                return Ok(hit);
            }
            Ok(None) => {}
            Err(e) => log::warn!("cache read failed, recomputing {record_key}: {e}"),
        }

        // Stage 4: compute, single-flight per fingerprint. A second caller
        // for the same fingerprint blocks here and then observes the stored
        // result on re-lookup.
        let gate = self.cache.flight_gate(&fp);
        let _guard = gate.lock().unwrap_or_else(PoisonError::into_inner);
        if let Ok(Some(hit)) = self.cache.lookup(&fp) {
            log::debug!("cache hit after gate for {record_key} ({fp})");
            return Ok(hit);
        }
        let raw = self.loader.load_raw(&request.record)?;
        self.engine_invocations.fetch_add(1, Ordering::Relaxed);
        let computed = transform::apply_chain(&raw, &descriptor)?;

        // Stage 5: persist and return. The caller gets the waveform even if
        // the store write failed.
        if let Err(e) = self.cache.store(&fp, &record_key, &computed) {
            log::warn!("failed to persist {record_key} ({fp}): {e}");
        }
        Ok(computed)
    }

    /// Drops every cached entry derived from `record` (used when the
    /// incident's source data changes). Returns the number removed.
    pub fn invalidate_record(&self, record: &RecordRef) -> GmResult<usize> {
        self.cache.invalidate_record(&record.key())
    }

    /// Number of transform-engine chain computations so far. Cache hits do
    /// not count; instrumentation hook for deduplication tests.
    pub fn engine_invocations(&self) -> u64 {
        self.engine_invocations.load(Ordering::Relaxed)
    }
}

/// Plans the implied conversion steps from a record's native unit to the
/// requested representation. Raw records convert through velocity with the
/// configured gain; the gain participates in the fingerprint like any other
/// parameter.
fn conversion_plan(native: UnitKind, target: UnitKind, raw_gain: f64) -> GmResult<Vec<Operation>> {
    use Operation::{Differentiate, Integrate, RawToVelocity};
    use UnitKind::{Acceleration, Displacement, Raw, Velocity};

    if native == target {
        return Ok(Vec::new());
    }
    let plan = match (native, target) {
        (Raw, Velocity) => vec![RawToVelocity { gain: raw_gain }],
        (Raw, Acceleration) => vec![RawToVelocity { gain: raw_gain }, Differentiate],
        (Raw, Displacement) => vec![RawToVelocity { gain: raw_gain }, Integrate],
        (Velocity, Acceleration) => vec![Differentiate],
        (Velocity, Displacement) => vec![Integrate],
        (Acceleration, Velocity) => vec![Integrate],
        (Acceleration, Displacement) => vec![Integrate, Integrate],
        (Displacement, Velocity) => vec![Differentiate],
        (Displacement, Acceleration) => vec![Differentiate, Differentiate],
        (from, to) => return Err(GmError::InvalidConversion { from, to }),
    };
    Ok(plan)
}

/// A deterministic synthetic loader for tests and demos: every record is a
/// decaying sine acceleration series whose frequency, phase, and noise are
/// seeded from the record key, so repeated loads are bit-identical.
pub struct SineLoader {
    sample_interval: f64,
    samples: usize,
}

impl SineLoader {
    /// Creates a loader generating `samples` points at `sample_interval`.
    pub fn new(sample_interval: f64, samples: usize) -> Self {
        Self {
            sample_interval,
            samples,
        }
    }

    fn seed_for(record: &RecordRef) -> u64 {
        // FNV-1a over the record key; only stability matters here.
        record
            .key()
            .bytes()
            .fold(0xcbf2_9ce4_8422_2325_u64, |h, b| {
                (h ^ u64::from(b)).wrapping_mul(0x0000_0100_0000_01b3)
            })
    }
}

impl RecordLoader for SineLoader {
    fn probe(&self, _record: &RecordRef) -> GmResult<RecordProbe> {
        Ok(RecordProbe {
            native_unit: UnitKind::Acceleration,
            sample_interval: self.sample_interval,
        })
    }

    fn load_raw(&self, record: &RecordRef) -> GmResult<Waveform> {
        let mut rng = StdRng::seed_from_u64(Self::seed_for(record));
        let freq_hz: f64 = rng.gen_range(0.5..5.0);
        let phase: f64 = rng.gen_range(0.0..std::f64::consts::TAU);
        let dt = self.sample_interval;
        let samples = (0..self.samples)
            .map(|i| {
                let t = i as f64 * dt;
                let noise: f64 = rng.gen_range(-0.01..0.01);
                (std::f64::consts::TAU * freq_hz * t + phase).sin() * (-0.2 * t).exp() + noise
            })
            .collect();
        Waveform::new(
            samples,
            dt,
            UnitKind::Acceleration,
            Some(record.component),
        )
    }
}

/// A loader serving waveforms from an explicit table; missing records are
/// `NotFound`. Useful for feeding exact series in tests.
#[derive(Default)]
pub struct TableLoader {
    records: Mutex<HashMap<String, Waveform>>,
}

impl TableLoader {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the raw waveform for a record.
    pub fn insert(&self, record: &RecordRef, waveform: Waveform) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.key(), waveform);
    }
}

impl RecordLoader for TableLoader {
    fn probe(&self, record: &RecordRef) -> GmResult<RecordProbe> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let w = records
            .get(&record.key())
            .ok_or_else(|| GmError::NotFound(record.key()))?;
        Ok(RecordProbe {
            native_unit: w.unit(),
            sample_interval: w.sample_interval(),
        })
    }

    fn load_raw(&self, record: &RecordRef) -> GmResult<Waveform> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&record.key())
            .cloned()
            .ok_or_else(|| GmError::NotFound(record.key()))
    }
}
