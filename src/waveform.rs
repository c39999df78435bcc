//! The immutable sampled time-series representation.
//!
//! A [`Waveform`] is the single data carrier flowing through the transform
//! engine and the cache: an ordered sequence of floating-point samples at a
//! fixed sample interval, tagged with the physical quantity it represents
//! ([`UnitKind`]) and optionally the recording component.
//!
//! Waveforms are immutable after creation. Every transform returns a new
//! `Waveform` and never mutates its input; this keeps cache equality and
//! determinism guarantees sound.

use serde::{Deserialize, Serialize};

use crate::error::{GmError, GmResult};

/// The physical quantity a waveform represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    /// Unconverted instrument counts.
    Raw,
    /// Ground velocity.
    Velocity,
    /// Ground acceleration.
    Acceleration,
    /// Ground displacement.
    Displacement,
    /// Dimensionless derived data (e.g. a response spectrum).
    Unitless,
}

impl UnitKind {
    /// Short stable tag used in fingerprints and log lines.
    pub fn tag(&self) -> &'static str {
        match self {
            UnitKind::Raw => "raw",
            UnitKind::Velocity => "vel",
            UnitKind::Acceleration => "acc",
            UnitKind::Displacement => "disp",
            UnitKind::Unitless => "unitless",
        }
    }
}

/// Recording component of a station channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Component {
    /// First horizontal component.
    H1,
    /// Second horizontal component.
    H2,
    /// Vertical component.
    Vertical,
}

impl Component {
    /// Short stable tag used in fingerprints and log lines.
    pub fn tag(&self) -> &'static str {
        match self {
            Component::H1 => "h1",
            Component::H2 => "h2",
            Component::Vertical => "ver",
        }
    }
}

/// An immutable sampled time series with a fixed sample interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waveform {
    samples: Vec<f64>,
    sample_interval: f64,
    unit: UnitKind,
    component: Option<Component>,
}

impl Waveform {
    /// Creates a waveform, validating the series invariants: at least one
    /// sample and a strictly positive, finite sample interval.
    pub fn new(
        samples: Vec<f64>,
        sample_interval: f64,
        unit: UnitKind,
        component: Option<Component>,
    ) -> GmResult<Self> {
        if samples.is_empty() {
            return Err(GmError::InvalidRequest {
                step: 0,
                reason: "waveform must contain at least one sample".into(),
            });
        }
        if !(sample_interval.is_finite() && sample_interval > 0.0) {
            return Err(GmError::InvalidRequest {
                step: 0,
                reason: format!("sample interval must be > 0, got {sample_interval}"),
            });
        }
        Ok(Self {
            samples,
            sample_interval,
            unit,
            component,
        })
    }

    /// Returns a new waveform carrying `samples` but keeping this waveform's
    /// interval and component. Used by transforms that preserve the time
    /// axis (filters, tapers, integration).
    pub fn with_samples(&self, samples: Vec<f64>, unit: UnitKind) -> GmResult<Self> {
        Self::new(samples, self.sample_interval, unit, self.component)
    }

    /// The sample values.
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false; the constructor rejects empty series.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample interval in seconds.
    pub fn sample_interval(&self) -> f64 {
        self.sample_interval
    }

    /// The physical quantity of this series.
    pub fn unit(&self) -> UnitKind {
        self.unit
    }

    /// Recording component, if known.
    pub fn component(&self) -> Option<Component> {
        self.component
    }

    /// Nyquist frequency implied by the sample interval, in Hz.
    pub fn nyquist_hz(&self) -> f64 {
        0.5 / self.sample_interval
    }

    /// Peak absolute amplitude of the series.
    pub fn peak(&self) -> f64 {
        self.samples.iter().fold(0.0_f64, |m, s| m.max(s.abs()))
    }
}

/// Nyquist frequency for a given sample interval, in Hz.
///
/// Standalone so descriptor validation can check filter corners before any
/// waveform has been loaded.
pub fn nyquist_hz(sample_interval: f64) -> f64 {
    0.5 / sample_interval
}
