//! Zero-phase Butterworth filtering.
//!
//! Filters are built from cascaded biquad second-order sections using the
//! standard Butterworth pole-Q sequence `Q_k = 1 / (2 sin(π(2k+1)/(2N)))`
//! for an order-N design. Zero phase comes from a forward-backward pass:
//! filter, reverse, filter again with fresh state, reverse back. Output
//! length always equals input length.

use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type};

use crate::error::{GmError, GmResult};

/// Forward-backward Butterworth lowpass.
pub fn zero_phase_lowpass(
    samples: &[f64],
    sample_interval: f64,
    corner_hz: f64,
    order: u32,
) -> GmResult<Vec<f64>> {
    let coeffs = design(Type::LowPass, sample_interval, corner_hz, order)?;
    Ok(zero_phase(samples, &coeffs))
}

/// Forward-backward Butterworth highpass.
pub fn zero_phase_highpass(
    samples: &[f64],
    sample_interval: f64,
    corner_hz: f64,
    order: u32,
) -> GmResult<Vec<f64>> {
    let coeffs = design(Type::HighPass, sample_interval, corner_hz, order)?;
    Ok(zero_phase(samples, &coeffs))
}

/// Designs the biquad cascade for an order-N Butterworth response.
fn design(
    filter_type: Type<f64>,
    sample_interval: f64,
    corner_hz: f64,
    order: u32,
) -> GmResult<Vec<Coefficients<f64>>> {
    let fs = 1.0 / sample_interval;
    let n = order as usize;
    let mut coeffs = Vec::with_capacity(n / 2);
    for k in 0..n / 2 {
        let q = 1.0 / (2.0 * (std::f64::consts::PI * (2 * k + 1) as f64 / (2 * n) as f64).sin());
        let c = Coefficients::<f64>::from_params(filter_type, fs.hz(), corner_hz.hz(), q)
            .map_err(|e| {
                GmError::InvalidFilterParameter(format!(
                    "coefficient design failed for corner {corner_hz} Hz at fs {fs} Hz: {e:?}"
                ))
            })?;
        coeffs.push(c);
    }
    Ok(coeffs)
}

/// One pass through the cascade, fresh state per section.
fn run_cascade(samples: Vec<f64>, coeffs: &[Coefficients<f64>]) -> Vec<f64> {
    let mut out = samples;
    for c in coeffs {
        let mut section = DirectForm2Transposed::<f64>::new(*c);
        for s in out.iter_mut() {
            *s = section.run(*s);
        }
    }
    out
}

fn zero_phase(samples: &[f64], coeffs: &[Coefficients<f64>]) -> Vec<f64> {
    let mut out = run_cascade(samples.to_vec(), coeffs);
    out.reverse();
    let mut out = run_cascade(out, coeffs);
    out.reverse();
    out
}
