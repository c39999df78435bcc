//! Kaiser-window end tapers.
//!
//! A taper attenuates a configurable fraction of samples at the front, the
//! back, or both ends of a series toward zero, leaving every interior sample
//! bit-unchanged. The window shape is the rising half of a Kaiser window;
//! `beta` trades main-lobe width against side-lobe level in the usual way
//! (beta 0 degenerates to no attenuation except the very boundary).

use crate::descriptor::TaperEnd;

/// Applies the taper and returns the new sample vector.
///
/// `fraction` is interpreted per selected end: with n samples, the first
/// and/or last `floor(fraction * n)` samples are attenuated. A fraction
/// small enough to select zero samples leaves the series untouched.
pub fn taper(samples: &[f64], end: TaperEnd, fraction: f64, beta: f64) -> Vec<f64> {
    let m = (fraction * samples.len() as f64).floor() as usize;
    let mut out = samples.to_vec();
    if m == 0 {
        return out;
    }
    let ramp = kaiser_ramp(m, beta);
    if matches!(end, TaperEnd::Front | TaperEnd::Both) {
        for (s, r) in out.iter_mut().zip(&ramp) {
            *s *= r;
        }
    }
    if matches!(end, TaperEnd::Back | TaperEnd::Both) {
        for (s, r) in out.iter_mut().rev().zip(&ramp) {
            *s *= r;
        }
    }
    out
}

/// The rising half of a Kaiser window of half-length `m`: values for
/// offsets 0..m from the series boundary, reaching 1 at offset m.
fn kaiser_ramp(m: usize, beta: f64) -> Vec<f64> {
    let denom = bessel_i0(beta);
    (0..m)
        .map(|i| {
            let t = (i as f64 - m as f64) / m as f64; // in [-1, 0)
            bessel_i0(beta * (1.0 - t * t).sqrt()) / denom
        })
        .collect()
}

/// Modified Bessel function of the first kind, order zero, by power series.
/// Converges quickly for the beta range used in tapers.
fn bessel_i0(x: f64) -> f64 {
    let half = x / 2.0;
    let mut sum = 1.0;
    let mut term = 1.0;
    let mut k = 1.0;
    loop {
        term *= (half / k) * (half / k);
        sum += term;
        if term < sum * 1e-14 {
            return sum;
        }
        k += 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interior_samples_are_bit_unchanged() {
        let x: Vec<f64> = (0..100).map(|i| (i as f64 * 0.17).cos()).collect();
        let y = taper(&x, TaperEnd::Both, 0.1, 6.0);
        assert_eq!(&y[10..90], &x[10..90]);
    }

    #[test]
    fn front_taper_leaves_the_back_alone() {
        let x = vec![1.0; 50];
        let y = taper(&x, TaperEnd::Front, 0.2, 6.0);
        assert_eq!(&y[10..], &x[10..]);
        // boundary value is 1/I0(6) ~ 0.015
        assert!(y[0] < 0.02, "boundary sample should be near zero, got {}", y[0]);
        // monotone rise across the ramp
        for i in 1..10 {
            assert!(y[i] > y[i - 1]);
        }
    }

    #[test]
    fn back_taper_mirrors_the_front_taper() {
        let x = vec![1.0; 60];
        let front = taper(&x, TaperEnd::Front, 0.25, 8.0);
        let back = taper(&x, TaperEnd::Back, 0.25, 8.0);
        for i in 0..15 {
            assert_eq!(front[i], back[59 - i]);
        }
    }

    #[test]
    fn tiny_fraction_is_a_no_op() {
        let x = vec![2.5; 9];
        assert_eq!(taper(&x, TaperEnd::Both, 0.05, 6.0), x);
    }

    #[test]
    fn bessel_i0_matches_reference_values() {
        // Abramowitz & Stegun table values.
        assert!((bessel_i0(0.0) - 1.0).abs() < 1e-12);
        assert!((bessel_i0(1.0) - 1.2660658777520084).abs() < 1e-12);
        assert!((bessel_i0(2.0) - 2.2795853023360673).abs() < 1e-12);
    }
}
