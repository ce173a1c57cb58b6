//! Cross-validation of implementations.
//!
//! This module compares a reference FIR filter (usually the floating-point
//! design) against an implementation (usually the coefficients stored in the
//! hardware) by looking at their frequency responses, DC gains and step
//! responses.

use crate::{
    constants,
    error::{Error, Result},
};
use maia_firq_json::Classification;
use num_complex::Complex64;
use std::f64::consts::PI;

/// Frequency response comparison.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ValidationReport {
    /// Mean squared error between the magnitude responses.
    pub mse: f64,
    /// Maximum absolute error between the magnitude responses.
    pub max_abs_error: f64,
    /// Classification of the implementation.
    pub classification: Classification,
}

impl From<ValidationReport> for maia_firq_json::ValidationReport {
    fn from(report: ValidationReport) -> maia_firq_json::ValidationReport {
        maia_firq_json::ValidationReport {
            mse: report.mse,
            max_abs_error: report.max_abs_error,
            classification: report.classification,
        }
    }
}

/// Step response comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct StepComparison {
    /// Step response of the reference.
    pub reference: Vec<f64>,
    /// Step response of the implementation.
    pub implementation: Vec<f64>,
    /// Maximum absolute difference between both step responses.
    pub max_abs_error: f64,
}

/// Classifies an implementation according to its maximum frequency response
/// error.
///
/// Errors below 0.01 are a [`Pass`](Classification::Pass), errors below 0.1
/// are [`Good`](Classification::Good), and larger errors need a
/// [`Check`](Classification::Check).
pub fn classify(max_abs_error: f64) -> Classification {
    if max_abs_error < constants::PASS_THRESHOLD {
        Classification::Pass
    } else if max_abs_error < constants::GOOD_THRESHOLD {
        Classification::Good
    } else {
        Classification::Check
    }
}

/// Computes the magnitude of the frequency response of a FIR filter.
///
/// The response is evaluated at the `n_points` frequencies `pi * k / n_points`,
/// for `k = 0, ..., n_points - 1`, which are uniformly spaced in `[0, pi)`.
pub fn frequency_response(coeffs: &[f64], n_points: usize) -> Vec<f64> {
    (0..n_points)
        .map(|k| {
            let omega = PI * k as f64 / n_points as f64;
            // H(e^jw) = sum h[n] e^(-jwn)
            coeffs
                .iter()
                .enumerate()
                .map(|(n, &h)| h * Complex64::from_polar(1.0, -omega * n as f64))
                .sum::<Complex64>()
                .norm()
        })
        .collect()
}

/// Compares the frequency responses of a reference and an implementation.
///
/// An error is returned if `n_points` is zero.
///
/// # Examples
/// ```
/// use maia_firq::validate::compare;
/// use maia_firq_json::Classification;
/// let reference = [0.25, 0.5, 0.25];
/// let report = compare(&reference, &reference, 512)?;
/// assert_eq!(report.max_abs_error, 0.0);
/// assert_eq!(report.classification, Classification::Pass);
/// # Ok::<(), maia_firq::Error>(())
/// ```
pub fn compare(
    reference: &[f64],
    implementation: &[f64],
    n_points: usize,
) -> Result<ValidationReport> {
    if n_points == 0 {
        return Err(Error::InvalidParameter(
            "the frequency response needs at least one point".to_string(),
        ));
    }
    let h_ref = frequency_response(reference, n_points);
    let h_impl = frequency_response(implementation, n_points);
    let errors = h_ref.iter().zip(h_impl.iter()).map(|(a, b)| a - b);
    let mse = errors.clone().map(|e| e * e).sum::<f64>() / n_points as f64;
    let max_abs_error = errors.map(f64::abs).fold(0.0, f64::max);
    Ok(ValidationReport {
        mse,
        max_abs_error,
        classification: classify(max_abs_error),
    })
}

/// Computes the difference between the DC gains of a reference and an
/// implementation.
pub fn dc_difference(reference: &[f64], implementation: &[f64]) -> f64 {
    reference.iter().sum::<f64>() - implementation.iter().sum::<f64>()
}

/// Filters a signal with a FIR filter.
///
/// The filter is causal and starts with zero state, so the output has the same
/// length as the input.
pub fn filter(coeffs: &[f64], input: &[f64]) -> Vec<f64> {
    (0..input.len())
        .map(|n| {
            coeffs
                .iter()
                .zip(input[..=n].iter().rev())
                .map(|(h, x)| h * x)
                .sum::<f64>()
        })
        .collect()
}

/// Computes the response of a FIR filter to a constant unit input of length
/// `len`.
pub fn step_response(coeffs: &[f64], len: usize) -> Vec<f64> {
    filter(coeffs, &vec![1.0; len])
}

/// Compares the step responses of a reference and an implementation.
pub fn compare_step(reference: &[f64], implementation: &[f64], len: usize) -> StepComparison {
    let reference = step_response(reference, len);
    let implementation = step_response(implementation, len);
    let max_abs_error = reference
        .iter()
        .zip(implementation.iter())
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max);
    StepComparison {
        reference,
        implementation,
        max_abs_error,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-12, "{a} != {b}");
    }

    #[test]
    fn classification_boundaries() {
        assert_eq!(classify(0.005), Classification::Pass);
        assert_eq!(classify(0.05), Classification::Good);
        assert_eq!(classify(0.5), Classification::Check);
        assert_eq!(classify(0.01), Classification::Good);
        assert_eq!(classify(0.1), Classification::Check);
    }

    #[test]
    fn response() {
        // moving average of length 2: |H| = |cos(w/2)|
        let h = frequency_response(&[0.5, 0.5], 4);
        assert_eq!(h.len(), 4);
        for (k, &x) in h.iter().enumerate() {
            let omega = PI * k as f64 / 4.0;
            assert_close(x, (omega / 2.0).cos());
        }
        // DC response is the sum of the coefficients
        assert_close(frequency_response(&[0.1, 0.2, 0.3], 8)[0], 0.6);
    }

    #[test]
    fn scaled_implementation() {
        let reference = crate::fold::unfold(&[0.0234, 0.0513, 0.1172, 0.1719, 0.2031, 0.2145]);
        let implementation = reference.iter().map(|x| x * 1.02).collect::<Vec<f64>>();
        let report = compare(&reference, &implementation, 512).unwrap();
        // the maximum error happens at DC, where the gain is largest
        let dc = reference.iter().sum::<f64>();
        assert_close(report.max_abs_error, 0.02 * dc);
        assert_eq!(report.classification, Classification::Good);
        assert!(report.mse > 0.0 && report.mse < report.max_abs_error.powi(2));
    }

    #[test]
    fn quantized_implementation() {
        let reference = crate::fold::unfold(&[0.0234, 0.0513, 0.1172, 0.1719, 0.2031, 0.2145]);
        let quantized =
            crate::quantize::quantize(&reference, crate::format::FixedPointFormat::Q8_8)
                .reconstructed();
        let report = compare(&reference, &quantized, 512).unwrap();
        // each tap is off by at most half an LSB
        assert!(report.max_abs_error <= 11.0 * 0.5 / 256.0);
        assert_eq!(report.classification, Classification::Pass);
    }

    #[test]
    fn zero_points() {
        assert!(compare(&[1.0], &[1.0], 0).is_err());
    }

    #[test]
    fn dc() {
        assert_close(dc_difference(&[0.5, 0.5], &[0.25, 0.5]), 0.25);
    }

    #[test]
    fn step() {
        let step = step_response(&[0.25, 0.5, 0.25], 5);
        assert_eq!(step, vec![0.25, 0.75, 1.0, 1.0, 1.0]);
        let comparison = compare_step(&[0.25, 0.5, 0.25], &[0.25, 0.5, 0.5], 4);
        assert_eq!(comparison.max_abs_error, 0.25);
    }

    #[test]
    fn filter_impulse() {
        let coeffs = [1.0, 2.0, 3.0];
        assert_eq!(
            filter(&coeffs, &[1.0, 0.0, 0.0, 0.0, 0.0]),
            vec![1.0, 2.0, 3.0, 0.0, 0.0]
        );
        assert_eq!(filter(&coeffs, &[1.0]), vec![1.0]);
    }
}
