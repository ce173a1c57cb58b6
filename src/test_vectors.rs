//! Test vectors for the hardware testbench.
//!
//! This module generates pairs of input and expected output files, which are
//! used by the Verilog testbench of the FIR filter. Each file contains one
//! value per line with 6 decimal places.

use crate::{
    artifact,
    error::{Error, Result},
    validate::filter,
};
use std::f64::consts::PI;
use std::path::{Path, PathBuf};

/// Test signal.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TestSignal {
    /// Constant unit signal.
    Dc,
    /// Low frequency sinusoid with amplitude 0.5.
    SineLow,
    /// Unit step in the middle of the signal.
    Step,
}

impl TestSignal {
    /// List of all the test signals.
    pub const ALL: [TestSignal; 3] = [TestSignal::Dc, TestSignal::SineLow, TestSignal::Step];

    /// Gives the name of the test signal, which is used in the file names.
    pub fn name(&self) -> &'static str {
        match self {
            TestSignal::Dc => "dc",
            TestSignal::SineLow => "sine_low",
            TestSignal::Step => "step",
        }
    }

    /// Gives the samples of the test signal.
    pub fn samples(&self) -> Vec<f64> {
        const LEN: usize = 50;
        match self {
            TestSignal::Dc => vec![1.0; LEN],
            TestSignal::SineLow => {
                // first half of a 100 point grid covering one second, with a
                // 50 Hz sinusoid
                (0..LEN)
                    .map(|j| {
                        let t = j as f64 / 99.0;
                        0.5 * (2.0 * PI * 50.0 * t).sin()
                    })
                    .collect()
            }
            TestSignal::Step => (0..LEN)
                .map(|j| if j < LEN / 2 { 0.0 } else { 1.0 })
                .collect(),
        }
    }
}

impl std::fmt::Display for TestSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::result::Result<(), std::fmt::Error> {
        write!(f, "{}", self.name())
    }
}

/// Formats a list of values with one value per line and 6 decimal places.
pub fn format_values(values: &[f64]) -> String {
    values.iter().map(|x| format!("{x:.6}\n")).collect()
}

/// Writes the test vectors for a filter.
///
/// For each [`TestSignal`], the files `<name>_input.csv` and
/// `<name>_expected.csv` are written in `dir`, which is created if it does not
/// exist. The expected output is computed by filtering the input with the full
/// coefficient list `coeffs`. The paths of the files written are returned.
#[tracing::instrument(level = "debug", skip(coeffs))]
pub fn write_test_vectors(dir: &Path, coeffs: &[f64]) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).map_err(|err| Error::Io {
        path: dir.to_path_buf(),
        source: err,
    })?;
    let mut paths = Vec::new();
    for signal in TestSignal::ALL {
        let input = signal.samples();
        let expected = filter(coeffs, &input);
        for (suffix, values) in [("input", &input), ("expected", &expected)] {
            let path = dir.join(format!("{}_{suffix}.csv", signal.name()));
            artifact::write_atomic(&path, format_values(values).as_bytes())?;
            paths.push(path);
        }
    }
    tracing::info!(dir = %dir.display(), files = paths.len(), "wrote test vectors");
    Ok(paths)
}
