//! Coefficient quantization.
//!
//! This module converts real-valued FIR coefficients into the fixed-point
//! integers stored in the hardware. Rounding is done half to even and values
//! outside of the range of the format are saturated, as the hardware does.
//! Saturation is not an error. It is reported as a
//! [`Diagnostic::Saturated`].

use crate::{format::FixedPointFormat, hex, Diagnostic};

/// Quantized coefficient.
///
/// A raw fixed-point integer together with its format and the real value that
/// it represents.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct QuantizedCoefficient {
    raw: i32,
    format: FixedPointFormat,
    reconstructed: f64,
}

impl QuantizedCoefficient {
    /// Creates a quantized coefficient from a raw integer.
    pub fn from_raw(raw: i32, format: FixedPointFormat) -> QuantizedCoefficient {
        QuantizedCoefficient {
            raw,
            format,
            reconstructed: format.to_real(raw),
        }
    }

    /// Gives the raw fixed-point integer.
    pub fn raw(&self) -> i32 {
        self.raw
    }

    /// Gives the fixed-point format.
    pub fn format(&self) -> FixedPointFormat {
        self.format
    }

    /// Gives the real value represented by the coefficient.
    pub fn reconstructed(&self) -> f64 {
        self.reconstructed
    }

    /// Gives the hexadecimal literal of the coefficient.
    pub fn hex(&self) -> String {
        hex::encode(self.raw, self.format)
    }

    /// Returns a JSON [`Coefficient`](maia_firq_json::Coefficient) for the
    /// coefficient at position `index`.
    pub fn to_json(&self, index: usize) -> maia_firq_json::Coefficient {
        maia_firq_json::Coefficient {
            index,
            raw: self.raw,
            hex: self.hex(),
            value: self.reconstructed,
        }
    }
}

/// Result of quantizing a list of coefficients.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantization {
    format: FixedPointFormat,
    coefficients: Vec<QuantizedCoefficient>,
    mse: f64,
    diagnostics: Vec<Diagnostic>,
}

impl Quantization {
    /// Gives the fixed-point format.
    pub fn format(&self) -> FixedPointFormat {
        self.format
    }

    /// Gives the quantized coefficients.
    pub fn coefficients(&self) -> &[QuantizedCoefficient] {
        &self.coefficients
    }

    /// Gives the mean squared error between the original coefficients and the
    /// reconstructed ones.
    pub fn mse(&self) -> f64 {
        self.mse
    }

    /// Gives the saturation diagnostics.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Returns `true` if some coefficient was saturated.
    pub fn saturated(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    /// Gives the raw fixed-point integers.
    pub fn raw(&self) -> Vec<i32> {
        self.coefficients.iter().map(|c| c.raw).collect()
    }

    /// Gives the real values represented by the quantized coefficients.
    pub fn reconstructed(&self) -> Vec<f64> {
        self.coefficients.iter().map(|c| c.reconstructed).collect()
    }

    /// Gives the DC gain (sum) of the reconstructed coefficients.
    pub fn dc_gain(&self) -> f64 {
        self.coefficients.iter().map(|c| c.reconstructed).sum()
    }

    /// Returns a JSON [`Quantization`](maia_firq_json::Quantization).
    pub fn to_json(&self) -> maia_firq_json::Quantization {
        maia_firq_json::Quantization {
            format: self.format.to_string(),
            coefficients: self
                .coefficients
                .iter()
                .enumerate()
                .map(|(j, c)| c.to_json(j))
                .collect(),
            mse: self.mse,
            diagnostics: self.diagnostics.clone(),
        }
    }
}

/// Quantizes a list of coefficients.
///
/// Each coefficient `c` is converted to `round(c * 2^fractional_bits)`, with
/// ties rounded to even, and clamped to the range of `format`.
///
/// # Examples
/// ```
/// use maia_firq::{format::FixedPointFormat, quantize::quantize};
/// let q = quantize(&[0.0234, -0.02], FixedPointFormat::Q8_8);
/// assert_eq!(q.raw(), vec![6, -5]);
/// ```
pub fn quantize(coeffs: &[f64], format: FixedPointFormat) -> Quantization {
    let mut diagnostics = Vec::new();
    let coefficients = coeffs
        .iter()
        .enumerate()
        .map(|(j, &c)| {
            let (raw, saturated) = quantize_value(c, format);
            if saturated {
                tracing::debug!(index = j, value = c, raw, "coefficient saturated");
                diagnostics.push(Diagnostic::Saturated {
                    index: j,
                    value: c,
                    raw,
                });
            }
            QuantizedCoefficient::from_raw(raw, format)
        })
        .collect::<Vec<_>>();
    let mse = if coeffs.is_empty() {
        0.0
    } else {
        coeffs
            .iter()
            .zip(coefficients.iter())
            .map(|(&c, q)| (c - q.reconstructed).powi(2))
            .sum::<f64>()
            / coeffs.len() as f64
    };
    Quantization {
        format,
        coefficients,
        mse,
        diagnostics,
    }
}

/// Quantizes `coeffs * scale`.
pub fn quantize_scaled(coeffs: &[f64], scale: f64, format: FixedPointFormat) -> Quantization {
    let scaled = coeffs.iter().map(|&c| c * scale).collect::<Vec<f64>>();
    quantize(&scaled, format)
}

// Returns the raw value and whether it was saturated.
fn quantize_value(c: f64, format: FixedPointFormat) -> (i32, bool) {
    round_clamp(c, format.scale(), format.min_raw(), format.max_raw())
}

// Rounds `c * scale` half to even and clamps it to `[min, max]`. Returns the
// raw value and whether it was saturated.
pub(crate) fn round_clamp(c: f64, scale: f64, min: i32, max: i32) -> (i32, bool) {
    let rounded = (c * scale).round_ties_even();
    if rounded < f64::from(min) {
        (min, true)
    } else if rounded > f64::from(max) {
        (max, true)
    } else {
        // NaN also lands here and becomes 0
        (rounded as i32, false)
    }
}
