//! Mixed complementarity problems and their solver.
//!
//! A problem pairs each variable `x_i` with a residual `F_i(x)`; a solution
//! satisfies `x_i >= 0`, `F_i(x) >= 0` and `x_i F_i(x) = 0` for every free
//! pair. Pinned variables replace their pair with `x_i = value`.

mod check;
mod problem;
mod solver;

pub use check::{check_complementarity, ComplementarityReport, PairCheck};
pub use problem::{finite_difference_jacobian, project_onto_bounds, Bound, Complementarity};
pub use solver::{fischer_burmeister, McpOptions, McpSolution, McpSolver};
