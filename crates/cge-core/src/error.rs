//! Unified error type for the modeling pipeline
//!
//! Stage-specific errors (calibration, equilibrium, dataset I/O) convert into
//! [`CgeError`] so the CLI can report any failure through one path and map it to
//! a non-zero exit code.
//!
//! # Example
//!
//! ```ignore
//! use cge_core::{CgeError, CgeResult};
//!
//! fn run(path: &Path) -> CgeResult<()> {
//!     let data = load_dataset(path)?;
//!     calibrate(&data)?;
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Error type shared by every stage of the pipeline.
#[derive(Error, Debug)]
pub enum CgeError {
    /// I/O errors (file access, directory creation, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A required input file does not exist
    #[error("missing input file: {}", .0.display())]
    MissingInput(PathBuf),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Data validation errors (inconsistent sets, negative coefficients, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Solver errors (LP infeasible, MCP not converged, ...)
    #[error("Solver error: {0}")]
    Solver(String),

    /// Calibration LP infeasible or not solved to optimality
    #[error("Calibration failed: {0}")]
    Calibration(String),

    /// Benchmark does not reproduce the calibrated equilibrium
    #[error("Self-consistency check failed: {0}")]
    SelfConsistency(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using CgeError.
pub type CgeResult<T> = Result<T, CgeError>;

impl From<anyhow::Error> for CgeError {
    fn from(err: anyhow::Error) -> Self {
        CgeError::Other(format!("{err:#}"))
    }
}

impl From<String> for CgeError {
    fn from(s: String) -> Self {
        CgeError::Other(s)
    }
}

impl From<&str> for CgeError {
    fn from(s: &str) -> Self {
        CgeError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for CgeError {
    fn from(err: serde_json::Error) -> Self {
        CgeError::Parse(err.to_string())
    }
}

impl CgeError {
    /// Whether a failure of this kind should stop the whole run.
    ///
    /// Only a solver failure inside a single scenario is recoverable; the sweep
    /// decides that on its own, so every error that reaches this type is fatal
    /// except [`CgeError::Solver`].
    pub fn is_fatal(&self) -> bool {
        !matches!(self, CgeError::Solver(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CgeError::Solver("convergence failed".into());
        assert!(err.to_string().contains("Solver error"));
        assert!(err.to_string().contains("convergence failed"));
    }

    #[test]
    fn test_missing_input_names_file() {
        let err = CgeError::MissingInput(PathBuf::from("data/raw/abar.csv"));
        assert_eq!(err.to_string(), "missing input file: data/raw/abar.csv");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CgeError = io_err.into();
        assert!(matches!(err, CgeError::Io(_)));
    }

    #[test]
    fn test_fatality() {
        assert!(!CgeError::Solver("x".into()).is_fatal());
        assert!(CgeError::SelfConsistency("x".into()).is_fatal());
        assert!(CgeError::Calibration("x".into()).is_fatal());
        assert!(CgeError::MissingInput(PathBuf::from("x")).is_fatal());
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> CgeResult<()> {
            Err(CgeError::Validation("test".into()))
        }

        fn outer() -> CgeResult<()> {
            inner()?;
            Ok(())
        }

        assert!(outer().is_err());
    }
}
