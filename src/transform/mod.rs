//! The transform engine: pure numeric transforms over a [`Waveform`].
//!
//! Every function here is deterministic and input-immutable: given the same
//! waveform and parameters the output is bit-identical, and the input is
//! never modified. That keeps the cache's equality and determinism
//! guarantees sound.
//!
//! [`apply`] dispatches one [`Operation`] through exhaustive matching; unit
//! compatibility and parameter ranges are re-checked on entry via
//! [`Operation::output_unit`], so a descriptor that skipped resolver
//! validation still cannot reach a numeric kernel with bad inputs.

pub mod calculus;
pub mod filter;
pub mod spectrum;
pub mod taper;

use crate::descriptor::{Operation, OperationDescriptor};
use crate::error::GmResult;
use crate::waveform::Waveform;

/// Applies a single operation, returning a new waveform.
pub fn apply(waveform: &Waveform, op: &Operation) -> GmResult<Waveform> {
    let out_unit = op.output_unit(waveform.unit(), waveform.sample_interval())?;
    match op {
        Operation::Lowpass { corner_hz, order } => {
            let samples = filter::zero_phase_lowpass(
                waveform.samples(),
                waveform.sample_interval(),
                *corner_hz,
                *order,
            )?;
            waveform.with_samples(samples, out_unit)
        }
        Operation::Highpass { corner_hz, order } => {
            let samples = filter::zero_phase_highpass(
                waveform.samples(),
                waveform.sample_interval(),
                *corner_hz,
                *order,
            )?;
            waveform.with_samples(samples, out_unit)
        }
        Operation::Taper {
            end,
            fraction,
            beta,
        } => {
            let samples = taper::taper(waveform.samples(), *end, *fraction, *beta);
            waveform.with_samples(samples, out_unit)
        }
        Operation::Integrate => {
            let samples =
                calculus::cumulative_trapezoid(waveform.samples(), waveform.sample_interval());
            waveform.with_samples(samples, out_unit)
        }
        Operation::Differentiate => {
            let samples =
                calculus::finite_difference(waveform.samples(), waveform.sample_interval());
            waveform.with_samples(samples, out_unit)
        }
        Operation::RawToVelocity { gain } => {
            let samples = calculus::scale(waveform.samples(), *gain);
            waveform.with_samples(samples, out_unit)
        }
        Operation::ResponseSpectrum { periods, damping } => {
            spectrum::response_spectrum(waveform, periods, *damping)
        }
    }
}

/// Applies a descriptor's steps in order, threading each output into the
/// next step. Fails on the first invalid step without partial results.
pub fn apply_chain(waveform: &Waveform, descriptor: &OperationDescriptor) -> GmResult<Waveform> {
    let mut current = waveform.clone();
    for op in descriptor.steps() {
        current = apply(&current, op)?;
    }
    Ok(current)
}
