//! Design constants.
//!
//! This module contains constants that define the default hardware target and
//! the thresholds used to classify implementations.

use crate::format::FixedPointFormat;

/// Fixed-point format used by the folded FIR hardware (Q8.8).
pub const DEFAULT_FORMAT: FixedPointFormat = FixedPointFormat::Q8_8;

/// Name of the coefficient array in the hardware source.
pub const DEFAULT_ARRAY_NAME: &str = "coefficients";

/// Maximum frequency response error for a [`Pass`](maia_firq_json::Classification::Pass).
pub const PASS_THRESHOLD: f64 = 0.01;

/// Maximum frequency response error for a [`Good`](maia_firq_json::Classification::Good).
pub const GOOD_THRESHOLD: f64 = 0.1;

/// Number of frequencies at which responses are compared.
pub const DEFAULT_FREQUENCY_POINTS: usize = 512;

/// Length of the step response used to check the DC gain.
pub const DEFAULT_STEP_LENGTH: usize = 50;

/// Maximum DC gain error accepted by gain compensation.
pub const DEFAULT_GAIN_TOLERANCE: f64 = 0.01;

/// Total widths used in the bit-width sweep.
pub const DEFAULT_SWEEP_WIDTHS: [u8; 4] = [8, 12, 16, 24];
