//! Response-spectrum computation.
//!
//! For each requested oscillator period, a unit-mass single-degree-of-
//! freedom system with the given damping ratio is driven by the input
//! acceleration series and integrated with the Newmark average-acceleration
//! scheme (γ = 1/2, β = 1/4, unconditionally stable). The reported amplitude
//! per period is the pseudo-spectral acceleration ω²·max|u|.
//!
//! The output is a `Unitless` waveform index-aligned with the caller's
//! period list; its sample interval is a placeholder index step of 1.0.

use crate::error::GmResult;
use crate::waveform::{UnitKind, Waveform};

const GAMMA: f64 = 0.5;
const BETA: f64 = 0.25;

/// Computes the response spectrum of an acceleration waveform.
///
/// Unit-kind and parameter validation happen in
/// [`crate::descriptor::Operation::output_unit`] before this kernel runs.
pub fn response_spectrum(
    waveform: &Waveform,
    periods: &[f64],
    damping: f64,
) -> GmResult<Waveform> {
    let dt = waveform.sample_interval();
    let peaks: Vec<f64> = periods
        .iter()
        .map(|period| {
            let omega = 2.0 * std::f64::consts::PI / period;
            omega * omega * peak_displacement(waveform.samples(), dt, omega, damping)
        })
        .collect();
    Waveform::new(peaks, 1.0, UnitKind::Unitless, waveform.component())
}

/// Peak |u| of the SDOF oscillator u'' + 2ζω u' + ω² u = -a_g(t),
/// starting from rest.
fn peak_displacement(ground_acc: &[f64], dt: f64, omega: f64, damping: f64) -> f64 {
    let k = omega * omega;
    let c = 2.0 * damping * omega;

    // Newmark constant-coefficient form (unit mass).
    let a1 = 1.0 / (BETA * dt * dt) + GAMMA * c / (BETA * dt);
    let a2 = 1.0 / (BETA * dt) + (GAMMA / BETA - 1.0) * c;
    let a3 = (1.0 / (2.0 * BETA) - 1.0) + dt * c * (GAMMA / (2.0 * BETA) - 1.0);
    let k_hat = k + a1;

    let mut u = 0.0_f64;
    let mut v = 0.0_f64;
    let mut a = -ground_acc[0];
    let mut peak = u.abs();

    for &ag in &ground_acc[1..] {
        let p_hat = -ag + a1 * u + a2 * v + a3 * a;
        let u_next = p_hat / k_hat;
        let v_next =
            GAMMA / (BETA * dt) * (u_next - u) - (GAMMA / BETA - 1.0) * v
                - dt * (GAMMA / (2.0 * BETA) - 1.0) * a;
        let a_next = (u_next - u) / (BETA * dt * dt) - v / (BETA * dt)
            - (1.0 / (2.0 * BETA) - 1.0) * a;
        u = u_next;
        v = v_next;
        a = a_next;
        peak = peak.max(u.abs());
    }
    peak
}
