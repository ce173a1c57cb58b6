//! Error types.
//!
//! This module contains the error type returned by the coefficient codec and
//! validation routines. Non-fatal conditions, such as saturation of a
//! coefficient or an unparsable line in a hardware source, are not errors. They
//! are reported as [`Diagnostic`](crate::Diagnostic)s.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for maia-firq operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in maia-firq operations.
#[derive(Error, Debug)]
pub enum Error {
    /// An input artifact does not exist.
    #[error("{path} not found (expected {expected})")]
    MissingArtifact {
        /// Path of the missing artifact.
        path: PathBuf,
        /// Description of the expected contents.
        expected: &'static str,
    },

    /// I/O error while accessing an artifact.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path of the artifact.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A hexadecimal literal could not be decoded.
    #[error("malformed literal: {0}")]
    MalformedLiteral(#[from] crate::hex::HexError),

    /// A token in a coefficient file is not a number.
    #[error("{path}:{line}: cannot parse {token:?} as a coefficient")]
    ParseCoefficient {
        /// Path of the coefficient file.
        path: PathBuf,
        /// Line number (1-based).
        line: usize,
        /// Offending token.
        token: String,
    },

    /// The fixed-point format is not valid.
    #[error("invalid fixed-point format: {0}")]
    InvalidFormat(String),

    /// The coefficient list is empty.
    #[error("no coefficients specified")]
    EmptyCoefficients,

    /// The DC gain is zero, so it cannot be compensated.
    #[error("cannot compensate a filter with zero DC gain")]
    ZeroGain,

    /// Invalid parameter.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl Error {
    /// Builds an error from an I/O error on `path`.
    ///
    /// A [`NotFound`](std::io::ErrorKind::NotFound) error is turned into
    /// [`Error::MissingArtifact`].
    pub fn from_io(path: impl Into<PathBuf>, expected: &'static str, err: std::io::Error) -> Error {
        let path = path.into();
        if err.kind() == std::io::ErrorKind::NotFound {
            Error::MissingArtifact { path, expected }
        } else {
            Error::Io { path, source: err }
        }
    }

    /// Checks if this error only affects the steps that depend on an artifact.
    ///
    /// The pipeline uses this to skip dependent steps instead of aborting.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::MissingArtifact { .. })
    }
}
