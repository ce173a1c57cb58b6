//! maia-firq application.
//!
//! This module contains the top-level structure [`App`], which runs the
//! maia-firq commands using a [`Config`].

use crate::{
    args::Command,
    artifact,
    config::Config,
    constants,
    fold::{fold, is_symmetric, unfold},
    gain,
    quantize::{quantize, Quantization},
    sweep::bit_width_sweep,
    test_vectors::write_test_vectors,
    validate,
    verilog::CoefficientSource,
    Diagnostic, Error,
};
use anyhow::{Context, Result};
use chrono::prelude::*;
use std::path::Path;

// Absolute tolerance used to decide if a design is symmetric.
const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// maia-firq application.
#[derive(Debug, Clone)]
pub struct App {
    config: Config,
    source: CoefficientSource,
    json: bool,
}

impl App {
    /// Creates a new application.
    ///
    /// If `json` is `true`, the commands print their results in JSON.
    pub fn new(config: Config, json: bool) -> App {
        let source = CoefficientSource::new(config.format, &config.array_name);
        App {
            config,
            source,
            json,
        }
    }

    /// Gives the configuration of the application.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs a command.
    #[tracing::instrument(name = "App::run", level = "debug", skip(self))]
    pub fn run(&self, command: &Command) -> Result<()> {
        match command {
            Command::Quantize { folded } => self.quantize(*folded),
            Command::Extract => self.extract(),
            Command::Update => self.update(),
            Command::Verify { frequency_points } => {
                self.verify(frequency_points.unwrap_or(self.config.frequency_points))
            }
            Command::Optimize {
                tolerance,
                passes,
                write,
            } => self.optimize(
                tolerance.unwrap_or(self.config.gain_tolerance),
                passes.unwrap_or(self.config.gain_passes),
                *write,
            ),
            Command::TestVectors { dir, quantized } => self.test_vectors(
                dir.as_deref().unwrap_or(&self.config.test_vectors_dir),
                *quantized,
            ),
            Command::Sweep { widths } => {
                let widths = if widths.is_empty() {
                    &constants::DEFAULT_SWEEP_WIDTHS[..]
                } else {
                    &widths[..]
                };
                self.sweep(widths)
            }
            Command::Run => self.pipeline(),
        }
    }

    /// Runs the full pipeline.
    ///
    /// The hardware source is updated with the design, then the design is
    /// verified against the hardware source and test vectors are written. A
    /// missing artifact only skips the steps that depend on it.
    pub fn pipeline(&self) -> Result<()> {
        let steps: [(&str, fn(&App) -> Result<()>); 3] = [
            ("update", App::update),
            ("verify", |app: &App| app.verify(app.config.frequency_points)),
            ("test vectors", |app: &App| {
                app.test_vectors(&app.config.test_vectors_dir, false)
            }),
        ];
        for (name, step) in steps {
            if let Err(err) = step(self) {
                match err.downcast_ref::<Error>() {
                    Some(e) if e.is_recoverable() => {
                        tracing::error!(step = name, "skipping step: {e}");
                    }
                    _ => return Err(err.context(format!("{name} failed"))),
                }
            }
        }
        Ok(())
    }

    fn design(&self) -> Result<Vec<f64>> {
        Ok(artifact::read_coefficients(&self.config.coefficients)?)
    }

    // Coefficients of the design that are stored by the folded hardware.
    fn folded_design(&self, design: &[f64]) -> Vec<f64> {
        match self.config.folded_taps {
            Some(taps) => design[..taps.min(design.len())].to_vec(),
            None if is_symmetric(design, SYMMETRY_TOLERANCE) => fold(design),
            None => {
                tracing::warn!(
                    taps = design.len(),
                    "design is not symmetric with odd length; storing its first half"
                );
                design[..design.len().div_ceil(2)].to_vec()
            }
        }
    }

    fn print_json<T: serde::Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    // Quantizes coefficients with the configured format, logging saturated
    // coefficients.
    fn quantize_logged(&self, coeffs: &[f64]) -> Quantization {
        let q = quantize(coeffs, self.config.format);
        warn_saturated(q.diagnostics());
        q
    }

    fn quantize(&self, folded: bool) -> Result<()> {
        let design = self.design()?;
        let coeffs = if folded {
            self.folded_design(&design)
        } else {
            design
        };
        let q = self.quantize_logged(&coeffs);
        if self.json {
            return self.print_json(&q.to_json());
        }
        print!("{}", self.source.render(q.coefficients(), false));
        println!("Quantization error (MSE): {:.6e}", q.mse());
        Ok(())
    }

    fn extract(&self) -> Result<()> {
        let extraction = self.source.read_file(&self.config.verilog)?;
        if self.json {
            let coefficients = extraction
                .assignments
                .iter()
                .map(|a| a.coefficient.to_json(a.index))
                .collect::<Vec<_>>();
            return self.print_json(&coefficients);
        }
        for a in &extraction.assignments {
            println!(
                "[{}] {} = {:.6} (line {})",
                a.index,
                a.hex_text,
                a.coefficient.reconstructed(),
                a.line_position + 1
            );
        }
        println!(
            "DC gain (folded): {:.6}",
            extraction.coefficients().iter().sum::<f64>()
        );
        Ok(())
    }

    fn update(&self) -> Result<()> {
        let summary = self.update_hardware()?;
        self.print_update(&summary)
    }

    fn update_hardware(&self) -> Result<maia_firq_json::UpdateSummary> {
        let design = self.design()?;
        let q = self.quantize_logged(&self.folded_design(&design));
        self.write_hardware(&q.raw(), q.diagnostics())
    }

    // Writes coefficients into the hardware source. The saturation
    // diagnostics of the quantization are listed first in the summary.
    fn write_hardware(
        &self,
        raw: &[i32],
        saturated: &[Diagnostic],
    ) -> Result<maia_firq_json::UpdateSummary> {
        let path = &self.config.verilog;
        let rewrite = self.source.update_file(path, raw)?;
        let mut summary = rewrite.to_json(path);
        let mut diagnostics = saturated.to_vec();
        diagnostics.append(&mut summary.diagnostics);
        summary.diagnostics = diagnostics;
        Ok(summary)
    }

    fn print_update(&self, summary: &maia_firq_json::UpdateSummary) -> Result<()> {
        if self.json {
            return self.print_json(summary);
        }
        println!(
            "Updated {} of {} coefficients in {}",
            summary.updated, summary.matched, summary.path
        );
        Ok(())
    }

    fn verify(&self, frequency_points: usize) -> Result<()> {
        let report = self.verification(frequency_points)?;
        if self.json {
            return self.print_json(&report);
        }
        println!(
            "Design: {}-tap, DC gain {:.6}",
            report.design_taps, report.design_dc_gain
        );
        let (Some(response), Some(step_max_abs_error)) =
            (&report.response, report.step_max_abs_error)
        else {
            println!(
                "Hardware: no coefficients found in {}",
                self.config.verilog.display()
            );
            return Ok(());
        };
        println!(
            "Hardware: {} folded coefficients, DC gain {:.6}",
            report.hardware_taps, report.hardware_dc_gain
        );
        println!("Mean squared error: {:.6e}", response.mse);
        println!("Max error: {:.6}", response.max_abs_error);
        println!("Step response max error: {step_max_abs_error:.6}");
        println!("Implementation: {}", response.classification);
        Ok(())
    }

    // Compares the design against the coefficients in the hardware source.
    fn verification(
        &self,
        frequency_points: usize,
    ) -> Result<maia_firq_json::VerificationReport> {
        let design = self.design()?;
        let extraction = self.source.read_file(&self.config.verilog)?;
        let hardware = extraction.coefficients();
        let design_dc_gain = design.iter().sum::<f64>();
        let mut report = maia_firq_json::VerificationReport {
            datetime: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            design_taps: design.len(),
            hardware_taps: hardware.len(),
            design_dc_gain,
            hardware_dc_gain: 0.0,
            dc_difference: design_dc_gain,
            step_max_abs_error: None,
            response: None,
            diagnostics: extraction.diagnostics,
        };
        if hardware.is_empty() {
            tracing::warn!(
                path = %self.config.verilog.display(),
                "no hardware coefficients found; skipping comparison"
            );
            return Ok(report);
        }
        // The hardware stores the first K coefficients of the design.
        let taps = hardware.len();
        if design.len() != 2 * taps - 1 {
            tracing::warn!(
                design_taps = design.len(),
                hardware_taps = taps,
                "design length does not match the folded hardware"
            );
        }
        let reference = unfold(&design[..taps.min(design.len())]);
        let implementation = unfold(&hardware);
        let response = validate::compare(&reference, &implementation, frequency_points)?;
        let step = validate::compare_step(&reference, &implementation, self.config.step_length);
        report.hardware_dc_gain = implementation.iter().sum::<f64>();
        report.dc_difference = validate::dc_difference(&reference, &implementation);
        report.step_max_abs_error = Some(step.max_abs_error);
        report.response = Some(response.into());
        Ok(report)
    }

    fn optimize(&self, tolerance: f64, passes: u32, write: bool) -> Result<()> {
        let design = self.design()?;
        let compensation = gain::solve_iterative(&design, self.config.format, tolerance, passes)?;
        let stored = self.folded_design(&design).len();
        let stored_coefficients = &compensation.quantization.coefficients()[..stored];
        let json = compensation.to_json(stored);
        warn_saturated(&json.diagnostics);
        if self.json {
            self.print_json(&json)?;
        } else {
            println!("Original DC gain: {:.6}", compensation.original_gain);
            println!("Stage 1 compensation: {:.6}", compensation.stage1);
            println!("Stage 2 compensation: {:.6}", compensation.stage2);
            println!("Total compensation: {:.6}", compensation.scale);
            print!("{}", self.source.render(stored_coefficients, true));
            println!("Expected DC gain: {:.6}", compensation.achieved_gain);
            if compensation.converged {
                println!("Optimization: SUCCESS (unity gain achieved)");
            } else {
                println!(
                    "Optimization: ADJUST NEEDED (gain error: {:.6})",
                    compensation.error()
                );
            }
        }
        if write {
            let raw = stored_coefficients
                .iter()
                .map(|c| c.raw())
                .collect::<Vec<i32>>();
            let summary = self.write_hardware(&raw, &json.diagnostics)?;
            self.print_update(&summary)?;
        }
        Ok(())
    }

    fn test_vectors(&self, dir: &Path, quantized: bool) -> Result<()> {
        let design = self.design()?;
        let coeffs = if quantized {
            unfold(&self.quantize_logged(&self.folded_design(&design)).reconstructed())
        } else {
            design
        };
        let paths = write_test_vectors(dir, &coeffs)
            .with_context(|| format!("failed to write test vectors to {}", dir.display()))?;
        if !self.json {
            println!("Generated {} test vector files in {}", paths.len(), dir.display());
        }
        Ok(())
    }

    fn sweep(&self, widths: &[u8]) -> Result<()> {
        let design = self.design()?;
        let sweep = bit_width_sweep(&design, self.config.format, widths)?;
        if self.json {
            return self.print_json(&sweep);
        }
        for point in &sweep {
            println!(
                "{:2} bits ({} fractional): MSE {:.6e}",
                point.total_bits, point.fractional_bits, point.mse
            );
        }
        Ok(())
    }
}

fn warn_saturated(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        if let Diagnostic::Saturated { index, value, raw } = diagnostic {
            tracing::warn!(index, value, raw, "coefficient saturated");
        }
    }
}
