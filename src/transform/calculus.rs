//! Integration, differentiation, and gain conversion kernels.
//!
//! Integration is a cumulative trapezoid starting from zero, so an
//! integrated series always has a zero first sample. Differentiation uses
//! central differences with second-order one-sided stencils at the ends,
//! which keeps the integrate-then-differentiate round trip at O(dt²)
//! accuracy across the whole series, boundaries included.

/// Cumulative trapezoidal integration with zero initial condition.
pub fn cumulative_trapezoid(samples: &[f64], dt: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(samples.len());
    let mut acc = 0.0;
    out.push(acc);
    for pair in samples.windows(2) {
        acc += dt * (pair[0] + pair[1]) / 2.0;
        out.push(acc);
    }
    out
}

/// Finite-difference differentiation: central in the interior, second-order
/// one-sided at the first and last samples.
pub fn finite_difference(samples: &[f64], dt: f64) -> Vec<f64> {
    let n = samples.len();
    match n {
        // A one-sample series has no usable slope.
        1 => vec![0.0],
        2 => {
            let d = (samples[1] - samples[0]) / dt;
            vec![d, d]
        }
        _ => {
            let mut out = Vec::with_capacity(n);
            out.push((-3.0 * samples[0] + 4.0 * samples[1] - samples[2]) / (2.0 * dt));
            for i in 1..n - 1 {
                out.push((samples[i + 1] - samples[i - 1]) / (2.0 * dt));
            }
            out.push((3.0 * samples[n - 1] - 4.0 * samples[n - 2] + samples[n - 3]) / (2.0 * dt));
            out
        }
    }
}

/// Multiplies every sample by `gain` (counts-to-physical conversion).
pub fn scale(samples: &[f64], gain: f64) -> Vec<f64> {
    samples.iter().map(|s| s * gain).collect()
}
