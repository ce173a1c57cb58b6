//! maia-firq is a coefficient toolchain for fixed-point FIR filters
//! implemented in FPGAs with a folded symmetric architecture. It quantizes
//! floating-point filter designs, encodes them as Verilog hexadecimal
//! literals, rewrites the coefficient assignments of the hardware source,
//! compensates the DC gain lost to quantization, and cross-validates the
//! hardware coefficients against the design.

#![warn(missing_docs)]

pub mod app;
pub mod args;
pub mod artifact;
pub mod config;
pub mod constants;
pub mod error;
pub mod fold;
pub mod format;
pub mod gain;
pub mod hex;
pub mod quantize;
pub mod sweep;
pub mod test_vectors;
pub mod validate;
pub mod verilog;

pub use error::{Error, Result};
pub use maia_firq_json::Diagnostic;
