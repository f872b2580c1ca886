//! Dense linear-system backends used by the Newton steps of the MCP solver.

mod backend;
mod registry;

pub use backend::{FaerSolver, GaussSolver, LinearSystemBackend};
pub use registry::LinearSolverKind;
