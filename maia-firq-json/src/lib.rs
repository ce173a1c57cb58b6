//! maia-firq-json contains the JSON schemas used by maia-firq for its
//! configuration file and its machine-readable reports.

#![warn(missing_docs)]

use serde::{Deserialize, Serialize};

/// Pipeline configuration JSON schema.
///
/// This JSON schema corresponds to the optional configuration file given to
/// maia-firq with `--config`. All the fields are optional. Fields that are not
/// present take their default values (or the values given in the command
/// line).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct PipelineConfig {
    /// Path to the file with the floating-point filter design.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coefficients: Option<String>,
    /// Path to the hardware coefficient source (Verilog).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verilog: Option<String>,
    /// Directory where test vectors are written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_vectors_dir: Option<String>,
    /// Fixed-point format, such as `"q8.8"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Name of the coefficient array in the hardware source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub array_name: Option<String>,
    /// Number of coefficients stored by the folded hardware architecture.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folded_taps: Option<usize>,
    /// Maximum DC gain error accepted by gain compensation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gain_tolerance: Option<f64>,
    /// Maximum number of gain compensation passes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gain_passes: Option<u32>,
    /// Number of frequencies used to compare frequency responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_points: Option<usize>,
    /// Length of the step response used as a DC gain diagnostic.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_length: Option<usize>,
}

/// Implementation fidelity classification.
///
/// This enum lists the classes in which the maximum frequency response error
/// of an implementation is sorted.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Classification {
    /// Errors within acceptable range.
    Pass,
    /// Minor differences detected.
    Good,
    /// Significant differences detected.
    Check,
}

macro_rules! impl_str_conv {
    ($ty:ty, $($s:expr => $v:ident),*) => {
        impl std::str::FromStr for $ty {
            type Err = ();

            fn from_str(s: &str) -> Result<Self, ()> {
                Ok(match s {
                    $(
                        $s => <$ty>::$v,
                    )*
                        _ => return Err(()),
                })
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
                write!(f, "{}", match self {
                    $(
                        <$ty>::$v => $s,
                    )*
                })
            }
        }
    }
}

impl_str_conv!(Classification,
               "PASS" => Pass,
               "GOOD" => Good,
               "CHECK" => Check);

/// Frequency response comparison JSON schema.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct ValidationReport {
    /// Mean squared error between the magnitude responses.
    pub mse: f64,
    /// Maximum absolute error between the magnitude responses.
    pub max_abs_error: f64,
    /// Classification of the implementation.
    pub classification: Classification,
}

/// Verification report JSON schema.
///
/// This is produced by the `verify` command. It compares the floating-point
/// design against the coefficients found in the hardware source.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VerificationReport {
    /// Date and time of the verification in RFC 3339 format.
    pub datetime: String,
    /// Number of taps of the floating-point design.
    pub design_taps: usize,
    /// Number of (folded) coefficients found in the hardware source.
    pub hardware_taps: usize,
    /// DC gain of the floating-point design.
    pub design_dc_gain: f64,
    /// DC gain of the unfolded hardware coefficients.
    pub hardware_dc_gain: f64,
    /// Difference between the reference and the implementation DC gains.
    pub dc_difference: f64,
    /// Maximum absolute difference between the step responses.
    ///
    /// This is not present if the hardware source has no coefficients.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_max_abs_error: Option<f64>,
    /// Frequency response comparison.
    ///
    /// This is not present if the hardware source has no coefficients.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<ValidationReport>,
    /// Problems found while reading the hardware source.
    pub diagnostics: Vec<Diagnostic>,
}

/// Fixed-point coefficient JSON schema.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Coefficient {
    /// Coefficient index.
    pub index: usize,
    /// Raw fixed-point integer.
    pub raw: i32,
    /// Two's-complement hexadecimal literal.
    pub hex: String,
    /// Real value represented by the fixed-point integer.
    pub value: f64,
}

/// Quantization JSON schema.
///
/// This is produced by the `quantize` command.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Quantization {
    /// Fixed-point format.
    pub format: String,
    /// Quantized coefficients.
    pub coefficients: Vec<Coefficient>,
    /// Mean squared quantization error.
    pub mse: f64,
    /// Coefficients that were saturated.
    pub diagnostics: Vec<Diagnostic>,
}

/// Gain compensation JSON schema.
///
/// This is produced by the `optimize` command.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GainCompensation {
    /// DC gain of the floating-point design.
    pub original_gain: f64,
    /// Analytic correction factor.
    pub stage1: f64,
    /// Correction factor measured after quantization.
    pub stage2: f64,
    /// Total scale factor applied to the design.
    pub scale: f64,
    /// DC gain achieved after quantizing the scaled design.
    pub achieved_gain: f64,
    /// Absolute difference between the achieved gain and unity.
    pub error: f64,
    /// Whether the achieved gain is within tolerance.
    pub converged: bool,
    /// Number of correction passes performed.
    pub passes: u32,
    /// Compensated coefficients, as stored in the hardware.
    pub coefficients: Vec<Coefficient>,
    /// Compensated coefficients that were saturated.
    pub diagnostics: Vec<Diagnostic>,
}

/// Hardware source update JSON schema.
///
/// This is produced by the `update` command and by `optimize --write`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UpdateSummary {
    /// Path of the hardware source.
    pub path: String,
    /// Number of coefficient assignments found.
    pub matched: usize,
    /// Number of coefficient assignments rewritten.
    pub updated: usize,
    /// Problems found during the update.
    pub diagnostics: Vec<Diagnostic>,
}

/// Bit-width sweep point JSON schema.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct SweepPoint {
    /// Total number of bits.
    pub total_bits: u8,
    /// Number of fractional bits.
    pub fractional_bits: u8,
    /// Mean squared quantization error.
    pub mse: f64,
}

/// Non-fatal problem found while processing coefficients.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A coefficient was outside the representable range and was clamped.
    Saturated {
        /// Coefficient index.
        index: usize,
        /// Original real value.
        value: f64,
        /// Clamped raw value.
        raw: i32,
    },
    /// A line of the hardware source looked like a coefficient assignment but
    /// could not be parsed, so it was left untouched.
    Skipped {
        /// Line number (0-based).
        line: usize,
        /// Reason why the line was skipped.
        reason: String,
    },
}
