use cge_core::CgeError;
use thiserror::Error;

/// Calibration LP errors. All of them abort the run.
#[derive(Debug, Clone, Error)]
pub enum CalibrationError {
    /// Total capacity cannot cover reference demand
    #[error("calibration infeasible: capacity {capacity:.3} is below demand {demand:.3}")]
    Infeasible { capacity: f64, demand: f64 },

    /// The LP solver failed or returned a point that is not optimal
    #[error("calibration not optimal: {0}")]
    NotOptimal(String),

    #[error("calibration data invalid: {0}")]
    InvalidData(String),
}

/// Complementarity solve errors.
#[derive(Debug, Clone, Error)]
pub enum EquilibriumError {
    /// Newton iterations exhausted or stalled
    #[error("MCP solver failed to converge after {iterations} iterations (residual: {residual:.2e})")]
    NotConverged { iterations: usize, residual: f64 },

    #[error("dimension mismatch: {0}")]
    Dimension(String),

    #[error("invalid scenario: {0}")]
    InvalidScenario(String),

    /// The benchmark does not reproduce the calibrated point
    #[error("benchmark replication residual {residual:.2e} exceeds tolerance {tolerance:.2e}")]
    Replication { residual: f64, tolerance: f64 },
}

impl From<CalibrationError> for CgeError {
    fn from(err: CalibrationError) -> Self {
        match err {
            CalibrationError::InvalidData(msg) => CgeError::Validation(msg),
            other => CgeError::Calibration(other.to_string()),
        }
    }
}

impl From<EquilibriumError> for CgeError {
    fn from(err: EquilibriumError) -> Self {
        match err {
            EquilibriumError::Replication { .. } => CgeError::SelfConsistency(err.to_string()),
            EquilibriumError::InvalidScenario(msg) => CgeError::Validation(msg),
            other => CgeError::Solver(other.to_string()),
        }
    }
}
