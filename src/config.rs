//! Pipeline configuration.
//!
//! The configuration is built from the optional JSON configuration file and the
//! CLI arguments, which take precedence. Values not given in either place take
//! their defaults.

use crate::{args::Args, constants, format::FixedPointFormat};
use anyhow::{Context, Result};
use maia_firq_json::PipelineConfig;
use std::path::{Path, PathBuf};

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// File with the floating-point filter design.
    pub coefficients: PathBuf,
    /// Verilog coefficient source.
    pub verilog: PathBuf,
    /// Directory for test vectors.
    pub test_vectors_dir: PathBuf,
    /// Fixed-point format of the hardware coefficients.
    pub format: FixedPointFormat,
    /// Name of the coefficient array in the Verilog source.
    pub array_name: String,
    /// Number of coefficients stored by the folded hardware. If `None`, half
    /// of the design is stored.
    pub folded_taps: Option<usize>,
    /// Maximum DC gain error accepted by gain compensation.
    pub gain_tolerance: f64,
    /// Maximum number of gain compensation passes.
    pub gain_passes: u32,
    /// Number of frequencies used to compare frequency responses.
    pub frequency_points: usize,
    /// Length of the step response.
    pub step_length: usize,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            coefficients: PathBuf::from("fir_coefficients.csv"),
            verilog: PathBuf::from("rtl/fir_filter_folded.v"),
            test_vectors_dir: PathBuf::from("test_vectors"),
            format: constants::DEFAULT_FORMAT,
            array_name: constants::DEFAULT_ARRAY_NAME.to_string(),
            folded_taps: None,
            gain_tolerance: constants::DEFAULT_GAIN_TOLERANCE,
            gain_passes: 1,
            frequency_points: constants::DEFAULT_FREQUENCY_POINTS,
            step_length: constants::DEFAULT_STEP_LENGTH,
        }
    }
}

impl Config {
    /// Builds the configuration from the CLI arguments.
    ///
    /// If the arguments name a configuration file, it is read first.
    pub fn from_args(args: &Args) -> Result<Config> {
        let file = match &args.config {
            Some(path) => load(path)?,
            None => PipelineConfig::default(),
        };
        let mut config = Config::from_json(&file)?;
        if let Some(coefficients) = &args.coefficients {
            config.coefficients.clone_from(coefficients);
        }
        if let Some(verilog) = &args.verilog {
            config.verilog.clone_from(verilog);
        }
        if let Some(format) = args.format {
            config.format = format;
        }
        if let Some(array_name) = &args.array_name {
            config.array_name.clone_from(array_name);
        }
        if args.folded_taps.is_some() {
            config.folded_taps = args.folded_taps;
        }
        config.validate()?;
        Ok(config)
    }

    /// Builds the configuration from a JSON configuration file schema.
    pub fn from_json(json: &PipelineConfig) -> Result<Config> {
        let default = Config::default();
        let format = match &json.format {
            Some(format) => format.parse()?,
            None => default.format,
        };
        let config = Config {
            coefficients: json
                .coefficients
                .as_ref()
                .map_or(default.coefficients, PathBuf::from),
            verilog: json.verilog.as_ref().map_or(default.verilog, PathBuf::from),
            test_vectors_dir: json
                .test_vectors_dir
                .as_ref()
                .map_or(default.test_vectors_dir, PathBuf::from),
            format,
            array_name: json.array_name.clone().unwrap_or(default.array_name),
            folded_taps: json.folded_taps,
            gain_tolerance: json.gain_tolerance.unwrap_or(default.gain_tolerance),
            gain_passes: json.gain_passes.unwrap_or(default.gain_passes),
            frequency_points: json.frequency_points.unwrap_or(default.frequency_points),
            step_length: json.step_length.unwrap_or(default.step_length),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.folded_taps != Some(0),
            "the folded hardware must store at least one coefficient"
        );
        anyhow::ensure!(
            self.gain_tolerance.is_finite() && self.gain_tolerance >= 0.0,
            "gain tolerance must be a non-negative number"
        );
        anyhow::ensure!(
            self.gain_passes > 0,
            "at least one gain compensation pass is needed"
        );
        anyhow::ensure!(
            self.frequency_points > 0,
            "the frequency response needs at least one point"
        );
        anyhow::ensure!(
            !self.array_name.is_empty(),
            "the coefficient array name cannot be empty"
        );
        Ok(())
    }
}

/// Loads a JSON configuration file.
pub fn load(path: &Path) -> Result<PipelineConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("failed to parse configuration file {}", path.display()))
}
