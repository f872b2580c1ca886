use super::backend::{FaerSolver, GaussSolver, LinearSystemBackend};
use anyhow::{anyhow, Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Selects the dense backend used for Newton steps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinearSolverKind {
    Gauss,
    #[default]
    Faer,
}

impl LinearSolverKind {
    pub fn build(self) -> Arc<dyn LinearSystemBackend> {
        match self {
            LinearSolverKind::Gauss => Arc::new(GaussSolver),
            LinearSolverKind::Faer => Arc::new(FaerSolver),
        }
    }

    pub fn available() -> &'static [&'static str] {
        &["gauss", "faer"]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LinearSolverKind::Gauss => "gauss",
            LinearSolverKind::Faer => "faer",
        }
    }
}

impl FromStr for LinearSolverKind {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.to_ascii_lowercase().as_str() {
            "gauss" => Ok(LinearSolverKind::Gauss),
            "faer" | "default" => Ok(LinearSolverKind::Faer),
            other => Err(anyhow!(
                "unknown linear solver '{}'; supported values: {}",
                other,
                Self::available().join(", ")
            )),
        }
    }
}

impl fmt::Display for LinearSolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsing_supports_all_backends() {
        assert_eq!("gauss".parse::<LinearSolverKind>().unwrap(), LinearSolverKind::Gauss);
        assert_eq!("FAER".parse::<LinearSolverKind>().unwrap(), LinearSolverKind::Faer);
        assert!("lapack".parse::<LinearSolverKind>().is_err());
    }

    #[test]
    fn built_backends_solve_diagonal_system() {
        let matrix = [2.0, 0.0, 0.0, 3.0];
        for kind in [LinearSolverKind::Gauss, LinearSolverKind::Faer] {
            let x = kind.build().solve(&matrix, 2, &[4.0, 6.0]).unwrap();
            assert!((x[0] - 2.0).abs() < 1e-12 && (x[1] - 2.0).abs() < 1e-12);
        }
    }
}
