//! DC gain compensation.
//!
//! Quantization does not preserve the DC gain of a filter: rounding and
//! saturation change the sum of the coefficients. This module computes a scale
//! factor for the floating-point design such that, after quantization, the DC
//! gain is as close as possible to one.
//!
//! The compensation is done in two stages. The first stage is the analytic
//! correction `1 / sum(coeffs)`. The second stage quantizes the corrected
//! design, measures the gain that is actually achieved, and divides by it.

use crate::{
    error::{Error, Result},
    format::FixedPointFormat,
    quantize::{quantize_scaled, Quantization},
    Diagnostic,
};

/// Result of a gain compensation.
#[derive(Debug, Clone, PartialEq)]
pub struct GainCompensation {
    /// DC gain of the floating-point design.
    pub original_gain: f64,
    /// Analytic correction factor.
    pub stage1: f64,
    /// Correction factor measured after quantization.
    pub stage2: f64,
    /// Total scale factor, `stage1 * stage2`.
    pub scale: f64,
    /// DC gain of the design scaled by `scale` and quantized.
    pub achieved_gain: f64,
    /// Whether `achieved_gain` is within the tolerance of one.
    pub converged: bool,
    /// Number of stage 2 correction passes performed.
    pub passes: u32,
    /// Quantization of the design scaled by `scale`.
    pub quantization: Quantization,
}

impl GainCompensation {
    /// Gives the absolute difference between the achieved gain and one.
    pub fn error(&self) -> f64 {
        (self.achieved_gain - 1.0).abs()
    }

    /// Returns a JSON [`GainCompensation`](maia_firq_json::GainCompensation).
    ///
    /// Only the first `stored_taps` coefficients (and their saturation
    /// diagnostics) are included, since those are the ones stored by a folded
    /// implementation.
    pub fn to_json(&self, stored_taps: usize) -> maia_firq_json::GainCompensation {
        maia_firq_json::GainCompensation {
            original_gain: self.original_gain,
            stage1: self.stage1,
            stage2: self.stage2,
            scale: self.scale,
            achieved_gain: self.achieved_gain,
            error: self.error(),
            converged: self.converged,
            passes: self.passes,
            coefficients: self
                .quantization
                .coefficients()
                .iter()
                .take(stored_taps)
                .enumerate()
                .map(|(j, c)| c.to_json(j))
                .collect(),
            diagnostics: self
                .quantization
                .diagnostics()
                .iter()
                .filter(|d| {
                    matches!(d, Diagnostic::Saturated { index, .. } if *index < stored_taps)
                })
                .cloned()
                .collect(),
        }
    }
}

/// Computes the gain compensation of a design with a single correction pass.
///
/// If the quantized design does not reach unity gain within `tolerance`, the
/// result is returned with `converged` set to `false`. An error is returned if
/// the list of coefficients is empty or if its DC gain (before or after
/// quantization) is zero.
pub fn solve(coeffs: &[f64], format: FixedPointFormat, tolerance: f64) -> Result<GainCompensation> {
    solve_iterative(coeffs, format, tolerance, 1)
}

/// Computes the gain compensation of a design with up to `max_passes`
/// correction passes.
///
/// Each pass measures the gain achieved by the current scale factor and
/// corrects the stage 2 factor accordingly. Iteration stops when the gain is
/// within `tolerance` of one. The best result found is returned.
#[tracing::instrument(level = "debug", skip(coeffs))]
pub fn solve_iterative(
    coeffs: &[f64],
    format: FixedPointFormat,
    tolerance: f64,
    max_passes: u32,
) -> Result<GainCompensation> {
    if coeffs.is_empty() {
        return Err(Error::EmptyCoefficients);
    }
    if max_passes == 0 {
        return Err(Error::InvalidParameter(
            "at least one gain compensation pass is needed".to_string(),
        ));
    }
    let original_gain = coeffs.iter().sum::<f64>();
    if original_gain == 0.0 {
        return Err(Error::ZeroGain);
    }
    let stage1 = original_gain.recip();

    let mut stage2 = 1.0;
    let mut best: Option<GainCompensation> = None;
    for pass in 1..=max_passes {
        let measured = quantize_scaled(coeffs, stage1 * stage2, format).dc_gain();
        if measured == 0.0 {
            return Err(Error::ZeroGain);
        }
        stage2 /= measured;
        let scale = stage1 * stage2;
        let quantization = quantize_scaled(coeffs, scale, format);
        let achieved_gain = quantization.dc_gain();
        let converged = (achieved_gain - 1.0).abs() <= tolerance;
        tracing::debug!(pass, stage2, achieved_gain, "gain compensation pass");
        let result = GainCompensation {
            original_gain,
            stage1,
            stage2,
            scale,
            achieved_gain,
            converged,
            passes: pass,
            quantization,
        };
        if best.as_ref().map_or(true, |b| result.error() < b.error()) {
            best = Some(result);
        }
        if converged {
            break;
        }
    }
    // max_passes >= 1, so at least one result was produced
    let best = best.ok_or(Error::ZeroGain)?;
    if !best.converged {
        tracing::warn!(
            achieved_gain = best.achieved_gain,
            tolerance,
            "gain compensation did not converge"
        );
    }
    Ok(best)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unity_gain() {
        let coeffs = [0.1, 0.2, 0.3, 0.2, 0.1];
        let g = solve(&coeffs, FixedPointFormat::Q8_8, 0.01).unwrap();
        assert!((g.stage1 - 1.0 / 0.9).abs() < 1e-12);
        // stage 1 alone gives 255/256
        assert!((g.stage2 - 256.0 / 255.0).abs() < 1e-12);
        assert_eq!(g.passes, 1);
        assert!(g.converged);
        let achieved = quantize_scaled(&coeffs, g.scale, FixedPointFormat::Q8_8).dc_gain();
        assert_eq!(achieved, g.achieved_gain);
        assert!((achieved - 1.0).abs() < 0.01);
    }

    #[test]
    fn not_converged() {
        let format = "q4.2".parse::<FixedPointFormat>().unwrap();
        let coeffs = [0.1, 0.2, 0.3, 0.2, 0.1];
        let g = solve(&coeffs, format, 0.01).unwrap();
        assert!(!g.converged);
        assert_eq!(g.achieved_gain, 1.5);
        assert_eq!(g.error(), 0.5);
    }

    #[test]
    fn iterative() {
        let format = FixedPointFormat::Q8_8;
        let coeffs = [0.1, 0.2, 0.3, 0.2, 0.1];
        let single = solve(&coeffs, format, 1e-3).unwrap();
        let iterated = solve_iterative(&coeffs, format, 1e-3, 10).unwrap();
        assert!(iterated.error() <= single.error());
        assert!(iterated.passes >= 1 && iterated.passes <= 10);
    }

    #[test]
    fn folded_design() {
        let half = [0.0234, 0.0513, 0.1172, 0.1719, 0.2031, 0.2145];
        let full = crate::fold::unfold(&half);
        let g = solve(&full, FixedPointFormat::Q8_8, 0.01).unwrap();
        // the compensated design is still symmetric
        let raw = g.quantization.raw();
        assert!(raw.iter().eq(raw.iter().rev()));
        let json = g.to_json(half.len());
        assert_eq!(json.coefficients.len(), 6);
    }

    #[test]
    fn saturated_diagnostics() {
        // -0.5 cannot be represented in an unsigned format
        let format = "u4.4".parse::<FixedPointFormat>().unwrap();
        let g = solve(&[-0.5, 1.5], format, 0.01).unwrap();
        assert!(g.converged);
        assert_eq!(g.quantization.raw(), vec![0, 16]);
        let json = g.to_json(2);
        assert_eq!(json.diagnostics.len(), 1);
        assert!(matches!(
            json.diagnostics[0],
            Diagnostic::Saturated { index: 0, raw: 0, .. }
        ));
        assert!(g.to_json(0).diagnostics.is_empty());
    }

    #[test]
    fn errors() {
        let format = FixedPointFormat::Q8_8;
        assert!(matches!(solve(&[], format, 0.01), Err(Error::EmptyCoefficients)));
        assert!(matches!(
            solve(&[0.5, -0.5], format, 0.01),
            Err(Error::ZeroGain)
        ));
        // gain vanishes after saturation
        assert!(matches!(
            solve(&[300.0, -299.0, 1.0 / 256.0], format, 0.01),
            Err(Error::ZeroGain)
        ));
    }
}
