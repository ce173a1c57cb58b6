//! Artifact access.
//!
//! This module reads and writes the files handled by maia-firq: coefficient
//! files produced by the filter design, hardware coefficient sources and test
//! vectors. Files are always read fully into memory and written atomically, by
//! writing a temporary file next to the destination and renaming it, so that a
//! failure never leaves a partially written artifact behind.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Expected contents of a coefficient file, used in error messages.
pub const COEFFICIENT_FILE: &str = "a text file with one decimal coefficient per line";

/// Expected contents of a hardware coefficient source, used in error messages.
pub const VERILOG_SOURCE: &str =
    "a Verilog source with lines such as assign coefficients[0] = 16'h0000;";

/// Reads a text artifact.
pub fn read_text(path: &Path, expected: &'static str) -> Result<String> {
    std::fs::read_to_string(path).map_err(|err| Error::from_io(path, expected, err))
}

/// Reads a coefficient file.
///
/// The file contains decimal numbers separated by whitespace or newlines. Lines
/// starting with `#` are comments.
pub fn read_coefficients(path: &Path) -> Result<Vec<f64>> {
    let text = read_text(path, COEFFICIENT_FILE)?;
    let coefficients = parse_coefficients(&text, path)?;
    tracing::debug!(path = %path.display(), taps = coefficients.len(), "read coefficients");
    Ok(coefficients)
}

fn parse_coefficients(text: &str, path: &Path) -> Result<Vec<f64>> {
    let mut coefficients = Vec::new();
    for (j, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.starts_with('#') {
            continue;
        }
        for token in line.split_whitespace() {
            let value = token
                .parse::<f64>()
                .map_err(|_| Error::ParseCoefficient {
                    path: path.to_path_buf(),
                    line: j + 1,
                    token: token.to_string(),
                })?;
            coefficients.push(value);
        }
    }
    if coefficients.is_empty() {
        return Err(Error::EmptyCoefficients);
    }
    Ok(coefficients)
}

/// Writes an artifact atomically.
///
/// The contents are written to a temporary file in the same directory as
/// `path`, which is then renamed to `path`. The temporary file is removed if
/// any step fails.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let tmp_path = temporary_path(path);
    if let Err(err) = std::fs::write(&tmp_path, contents) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(Error::Io {
            path: tmp_path,
            source: err,
        });
    }
    if let Err(err) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(Error::Io {
            path: path.to_path_buf(),
            source: err,
        });
    }
    Ok(())
}

fn temporary_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse() {
        let text = "# design\n0.1\n  -0.25 \n\n1e-3 2.0\n";
        assert_eq!(
            parse_coefficients(text, Path::new("c.csv")).unwrap(),
            vec![0.1, -0.25, 1e-3, 2.0]
        );
    }

    #[test]
    fn parse_errors() {
        let err = parse_coefficients("0.1\nabc\n", Path::new("c.csv")).unwrap_err();
        assert_eq!(err.to_string(), "c.csv:2: cannot parse \"abc\" as a coefficient");
        assert!(matches!(
            parse_coefficients("# nothing\n", Path::new("c.csv")),
            Err(Error::EmptyCoefficients)
        ));
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_coefficients(&dir.path().join("missing.csv")).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn atomic_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        // no temporary files are left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn failed_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing_dir").join("out.txt");
        assert!(write_atomic(&path, b"data").is_err());
        assert!(!path.exists());
    }
}
