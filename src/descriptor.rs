//! Canonical, order-sensitive descriptions of processing chains.
//!
//! An [`OperationDescriptor`] is an ordered list of [`Operation`] steps with
//! their numeric parameters. Order is semantic (filter-then-integrate is not
//! integrate-then-filter) and is preserved verbatim; two descriptors are
//! equal iff they hold the same steps, in the same order, with the same
//! parameter values.
//!
//! The descriptor has a canonical byte encoding used as the hashing input
//! for cache fingerprints: the steps are serialized through
//! `serde_json::Value`, whose objects are BTreeMap-backed, so parameter
//! fields come out key-sorted regardless of how the request was built.
//!
//! Validation walks the unit kind of the series through the chain without
//! touching any sample data, so a malformed request fails before any
//! computation starts.

use serde::{Deserialize, Serialize};

use crate::error::{GmError, GmResult};
use crate::waveform::{nyquist_hz, UnitKind};

/// Which end(s) of the series a taper attenuates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaperEnd {
    /// Attenuate the leading samples.
    Front,
    /// Attenuate the trailing samples.
    Back,
    /// Attenuate both ends.
    Both,
}

/// A single processing step with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Zero-phase Butterworth lowpass filter.
    Lowpass {
        /// Corner frequency in Hz; strictly between 0 and Nyquist.
        corner_hz: f64,
        /// Filter order; even, 2..=16.
        order: u32,
    },
    /// Zero-phase Butterworth highpass filter.
    Highpass {
        /// Corner frequency in Hz; strictly between 0 and Nyquist.
        corner_hz: f64,
        /// Filter order; even, 2..=16.
        order: u32,
    },
    /// Kaiser-window taper over a fraction of the series at one or both ends.
    Taper {
        /// Which end(s) to attenuate.
        end: TaperEnd,
        /// Fraction of the series length tapered at each selected end,
        /// in (0, 0.5].
        fraction: f64,
        /// Kaiser window shape parameter; 0 gives a rectangular window.
        beta: f64,
    },
    /// Cumulative trapezoidal integration from zero.
    Integrate,
    /// Finite-difference differentiation.
    Differentiate,
    /// Counts-to-physical conversion of a raw series into velocity.
    RawToVelocity {
        /// Multiplicative instrument gain.
        gain: f64,
    },
    /// Peak single-degree-of-freedom oscillator response per period.
    /// Acceleration input only; terminal step.
    ResponseSpectrum {
        /// Oscillator periods in seconds, each > 0.
        periods: Vec<f64>,
        /// Damping ratio in [0, 1).
        damping: f64,
    },
}

impl Operation {
    /// Short name used in error messages and log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Lowpass { .. } => "lowpass",
            Operation::Highpass { .. } => "highpass",
            Operation::Taper { .. } => "taper",
            Operation::Integrate => "integrate",
            Operation::Differentiate => "differentiate",
            Operation::RawToVelocity { .. } => "raw_to_velocity",
            Operation::ResponseSpectrum { .. } => "response_spectrum",
        }
    }

    /// Unit kind produced when this step is applied to `input`, or the
    /// validation error a resolver must report. Parameter ranges are checked
    /// here too so invalid chains never reach the transform engine.
    pub fn output_unit(&self, input: UnitKind, sample_interval: f64) -> GmResult<UnitKind> {
        if input == UnitKind::Unitless {
            return Err(GmError::UnsupportedOperation(format!(
                "{} cannot be applied to a unitless series",
                self.name()
            )));
        }
        match self {
            Operation::Lowpass { corner_hz, order }
            | Operation::Highpass { corner_hz, order } => {
                check_filter_params(*corner_hz, *order, sample_interval)?;
                Ok(input)
            }
            Operation::Taper { fraction, beta, .. } => {
                if !(fraction.is_finite() && *fraction > 0.0 && *fraction <= 0.5) {
                    return Err(GmError::InvalidRequest {
                        step: 0,
                        reason: format!("taper fraction must be in (0, 0.5], got {fraction}"),
                    });
                }
                if !(beta.is_finite() && *beta >= 0.0) {
                    return Err(GmError::InvalidRequest {
                        step: 0,
                        reason: format!("taper beta must be >= 0, got {beta}"),
                    });
                }
                Ok(input)
            }
            Operation::Integrate => match input {
                UnitKind::Acceleration => Ok(UnitKind::Velocity),
                UnitKind::Velocity => Ok(UnitKind::Displacement),
                other => Err(GmError::InvalidConversion {
                    from: other,
                    to: other,
                }),
            },
            Operation::Differentiate => match input {
                UnitKind::Velocity => Ok(UnitKind::Acceleration),
                UnitKind::Displacement => Ok(UnitKind::Velocity),
                other => Err(GmError::InvalidConversion {
                    from: other,
                    to: other,
                }),
            },
            Operation::RawToVelocity { gain } => {
                if !(gain.is_finite() && *gain > 0.0) {
                    return Err(GmError::InvalidRequest {
                        step: 0,
                        reason: format!("raw-to-velocity gain must be > 0, got {gain}"),
                    });
                }
                if input != UnitKind::Raw {
                    return Err(GmError::InvalidConversion {
                        from: input,
                        to: UnitKind::Velocity,
                    });
                }
                Ok(UnitKind::Velocity)
            }
            Operation::ResponseSpectrum { periods, damping } => {
                if input != UnitKind::Acceleration {
                    return Err(GmError::UnsupportedOperation(format!(
                        "response spectrum requires an acceleration series, got {:?}",
                        input
                    )));
                }
                if periods.is_empty() {
                    return Err(GmError::InvalidRequest {
                        step: 0,
                        reason: "response spectrum requires at least one period".into(),
                    });
                }
                if let Some(bad) = periods.iter().find(|p| !(p.is_finite() && **p > 0.0)) {
                    return Err(GmError::InvalidRequest {
                        step: 0,
                        reason: format!("oscillator periods must be > 0, got {bad}"),
                    });
                }
                if !(damping.is_finite() && *damping >= 0.0 && *damping < 1.0) {
                    return Err(GmError::InvalidRequest {
                        step: 0,
                        reason: format!("damping ratio must be in [0, 1), got {damping}"),
                    });
                }
                Ok(UnitKind::Unitless)
            }
        }
    }
}

fn check_filter_params(corner_hz: f64, order: u32, sample_interval: f64) -> GmResult<()> {
    let nyquist = nyquist_hz(sample_interval);
    if !(corner_hz.is_finite() && corner_hz > 0.0 && corner_hz < nyquist) {
        return Err(GmError::InvalidFilterParameter(format!(
            "corner frequency {corner_hz} Hz outside (0, {nyquist}) Hz"
        )));
    }
    if !(2..=16).contains(&order) || order % 2 != 0 {
        return Err(GmError::InvalidFilterParameter(format!(
            "filter order must be even and within 2..=16, got {order}"
        )));
    }
    Ok(())
}

/// An ordered chain of processing steps.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OperationDescriptor {
    steps: Vec<Operation>,
}

impl OperationDescriptor {
    /// Builds a descriptor from steps in request order. Order is preserved
    /// verbatim; no reordering ever happens.
    pub fn new(steps: Vec<Operation>) -> Self {
        Self { steps }
    }

    /// The steps, in request order.
    pub fn steps(&self) -> &[Operation] {
        &self.steps
    }

    /// True when the chain has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Walks the unit kind through the chain, checking every step's
    /// parameters and unit compatibility. Returns the final unit kind.
    /// Fails with the index of the first offending step.
    pub fn validate(&self, start_unit: UnitKind, sample_interval: f64) -> GmResult<UnitKind> {
        let mut unit = start_unit;
        for (i, op) in self.steps.iter().enumerate() {
            unit = op.output_unit(unit, sample_interval).map_err(|e| match e {
                GmError::InvalidRequest { reason, .. } => GmError::InvalidRequest { step: i, reason },
                other => other,
            })?;
        }
        Ok(unit)
    }

    /// Canonical byte encoding: steps in request order, each step's
    /// parameters key-sorted. Two logically identical descriptors built
    /// through different code paths share one encoding.
    pub fn canonical_bytes(&self) -> GmResult<Vec<u8>> {
        let value = serde_json::to_value(&self.steps)?;
        Ok(serde_json::to_vec(&value)?)
    }
}
