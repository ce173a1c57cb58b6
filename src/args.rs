//! maia-firq CLI arguments.
//!
//! This module contains the definition of the CLI arguments for the maia-firq
//! application.

use crate::format::FixedPointFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// maia-firq CLI arguments.
///
/// Options given in the command line take precedence over the values in the
/// configuration file.
#[derive(Parser, Debug, Clone, PartialEq)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// JSON configuration file
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,
    /// File with the floating-point filter design [default: fir_coefficients.csv]
    #[clap(long, global = true)]
    pub coefficients: Option<PathBuf>,
    /// Verilog coefficient source [default: rtl/fir_filter_folded.v]
    #[clap(long, global = true)]
    pub verilog: Option<PathBuf>,
    /// Fixed-point format of the coefficients, such as q8.8 [default: q8.8]
    #[clap(long, global = true)]
    pub format: Option<FixedPointFormat>,
    /// Name of the coefficient array in the Verilog source [default: coefficients]
    #[clap(long, global = true)]
    pub array_name: Option<String>,
    /// Number of coefficients stored by the folded hardware [default: half of the design]
    #[clap(long, global = true)]
    pub folded_taps: Option<usize>,
    /// Print machine-readable JSON output
    #[clap(long, global = true)]
    pub json: bool,
    /// Command to run
    #[clap(subcommand)]
    pub command: Command,
}

/// maia-firq commands.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Quantize the design and print the Verilog coefficient assignments
    Quantize {
        /// Only quantize the coefficients stored by the folded hardware
        #[clap(long)]
        folded: bool,
    },
    /// Print the coefficients stored in the Verilog source
    Extract,
    /// Write the quantized design into the Verilog source
    Update,
    /// Compare the design against the coefficients in the Verilog source
    Verify {
        /// Number of frequencies used to compare the responses [default: 512]
        #[clap(long)]
        frequency_points: Option<usize>,
    },
    /// Compute DC gain compensated coefficients
    Optimize {
        /// Maximum DC gain error [default: 0.01]
        #[clap(long)]
        tolerance: Option<f64>,
        /// Maximum number of correction passes [default: 1]
        #[clap(long)]
        passes: Option<u32>,
        /// Write the compensated coefficients into the Verilog source
        #[clap(long)]
        write: bool,
    },
    /// Write test vectors for the Verilog testbench
    TestVectors {
        /// Output directory [default: test_vectors]
        #[clap(long)]
        dir: Option<PathBuf>,
        /// Filter with the quantized folded coefficients instead of the design
        #[clap(long)]
        quantized: bool,
    },
    /// Compute the quantization error for several coefficient widths
    Sweep {
        /// Coefficient widths in bits [default: 8,12,16,24]
        #[clap(long, value_delimiter = ',')]
        widths: Vec<u8>,
    },
    /// Run the full pipeline: update, verify and write test vectors
    Run,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse() {
        let args = Args::parse_from([
            "maia-firq",
            "optimize",
            "--tolerance",
            "0.001",
            "--format",
            "q4.12",
            "--write",
        ]);
        assert_eq!(args.format, Some(FixedPointFormat::Q4_12));
        assert_eq!(
            args.command,
            Command::Optimize {
                tolerance: Some(0.001),
                passes: None,
                write: true
            }
        );
    }

    #[test]
    fn sweep_widths() {
        let args = Args::parse_from(["maia-firq", "--json", "sweep", "--widths", "8,16"]);
        assert!(args.json);
        assert_eq!(args.command, Command::Sweep { widths: vec![8, 16] });
    }

    #[test]
    fn invalid_format() {
        assert!(Args::try_parse_from(["maia-firq", "--format", "x8", "extract"]).is_err());
    }

    #[test]
    fn clap_debug_assert() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
