//! Semismooth Newton method on the Fischer–Burmeister reformulation.
//!
//! Each free pair `(x_i, F_i)` becomes `phi(x_i, F_i) = 0` with
//! `phi(a, b) = a + b - sqrt(a^2 + b^2)`, which holds exactly when
//! `a >= 0, b >= 0, a b = 0`. Pinned pairs become `x_i - value = 0`.
//! Steps are globalized with Armijo backtracking on `0.5 ||Phi||^2`.

use cge_core::{LinearSolverKind, LinearSystemBackend};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, trace};

use super::problem::{Bound, Complementarity};
use crate::error::EquilibriumError;

/// Below this norm of `(a, b)` the kink of `phi` is treated as reached.
const KINK_RADIUS: f64 = 1e-12;

pub fn fischer_burmeister(a: f64, b: f64) -> f64 {
    a + b - a.hypot(b)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct McpOptions {
    /// Convergence threshold on `||Phi||_inf`
    pub tolerance: f64,
    /// Newton iteration limit; 0 evaluates the starting point only
    pub max_iterations: usize,
    /// Armijo sufficient-decrease constant
    pub armijo: f64,
    /// Step shrink factor during backtracking
    pub backtrack: f64,
    /// Smallest step length tried before the iteration stalls
    pub min_step: f64,
    pub linear_solver: LinearSolverKind,
}

impl Default for McpOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-8,
            max_iterations: 200,
            armijo: 1e-4,
            backtrack: 0.5,
            min_step: 1e-12,
            linear_solver: LinearSolverKind::default(),
        }
    }
}

/// Outcome of a solve, converged or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpSolution {
    pub x: Vec<f64>,
    /// `F(x)` at the final iterate
    pub residual: Vec<f64>,
    /// `||Phi(x)||_inf`
    pub phi_norm: f64,
    pub merit: f64,
    pub iterations: usize,
    pub converged: bool,
}

pub struct McpSolver {
    options: McpOptions,
    backend: Arc<dyn LinearSystemBackend>,
}

impl McpSolver {
    pub fn new(options: McpOptions) -> Self {
        let backend = options.linear_solver.build();
        Self { options, backend }
    }

    pub fn options(&self) -> &McpOptions {
        &self.options
    }

    /// Solve from `start`, failing with [`EquilibriumError::NotConverged`]
    /// when the tolerance is not reached.
    pub fn solve<P: Complementarity + ?Sized>(
        &self,
        problem: &P,
        start: &[f64],
    ) -> Result<McpSolution, EquilibriumError> {
        let solution = self.run(problem, start)?;
        if solution.converged {
            Ok(solution)
        } else {
            Err(EquilibriumError::NotConverged {
                iterations: solution.iterations,
                residual: solution.phi_norm,
            })
        }
    }

    /// Iterate from `start` and return the final point whether or not it
    /// converged.
    pub fn run<P: Complementarity + ?Sized>(
        &self,
        problem: &P,
        start: &[f64],
    ) -> Result<McpSolution, EquilibriumError> {
        let n = problem.dimension();
        let bounds = problem.bounds();
        if start.len() != n || bounds.len() != n {
            return Err(EquilibriumError::Dimension(format!(
                "problem has {n} pairs, start has {} values and {} bounds",
                start.len(),
                bounds.len()
            )));
        }

        let mut x: Vec<f64> = start
            .iter()
            .zip(&bounds)
            .map(|(&v, b)| match b {
                Bound::Fixed(value) => *value,
                Bound::NonNegative => v.max(0.0),
            })
            .collect();

        let mut f = vec![0.0; n];
        let mut phi = vec![0.0; n];
        let mut jac = vec![0.0; n * n];
        let mut h = vec![0.0; n * n];
        let mut iterations = 0;

        loop {
            let merit = self.evaluate(problem, &bounds, &x, &mut f, &mut phi);
            let phi_norm = inf_norm(&phi);
            trace!(iteration = iterations, phi_norm, merit, "mcp iterate");

            let converged = phi_norm.is_finite() && phi_norm <= self.options.tolerance;
            if converged || iterations >= self.options.max_iterations || !phi_norm.is_finite() {
                debug!(iterations, phi_norm, converged, "mcp solve finished");
                return Ok(McpSolution {
                    x,
                    residual: f,
                    phi_norm,
                    merit,
                    iterations,
                    converged,
                });
            }

            problem.jacobian(&x, &mut jac);
            newton_matrix(&bounds, &x, &f, &jac, &mut h);
            let gradient = transpose_times(&h, &phi, n);

            let neg_phi: Vec<f64> = phi.iter().map(|v| -v).collect();
            let mut direction = match self.backend.solve(&h, n, &neg_phi) {
                Ok(d) if d.iter().all(|v| v.is_finite()) => d,
                Ok(_) | Err(_) => {
                    debug!(iteration = iterations, "newton system singular, using gradient step");
                    gradient.iter().map(|g| -g).collect()
                }
            };
            let mut slope = dot(&gradient, &direction);
            if slope >= 0.0 {
                direction = gradient.iter().map(|g| -g).collect();
                slope = -dot(&gradient, &gradient);
            }

            match self.line_search(problem, &bounds, &x, &direction, merit, slope) {
                Some(next) => x = next,
                None => {
                    debug!(iteration = iterations, phi_norm, "line search stalled");
                    return Ok(McpSolution {
                        x,
                        residual: f,
                        phi_norm,
                        merit,
                        iterations,
                        converged: false,
                    });
                }
            }
            iterations += 1;
        }
    }

    /// Fill `f` and `phi` at `x` and return the merit `0.5 ||Phi||^2`.
    fn evaluate<P: Complementarity + ?Sized>(
        &self,
        problem: &P,
        bounds: &[Bound],
        x: &[f64],
        f: &mut [f64],
        phi: &mut [f64],
    ) -> f64 {
        problem.residual(x, f);
        for (i, bound) in bounds.iter().enumerate() {
            phi[i] = match bound {
                Bound::Fixed(value) => x[i] - value,
                Bound::NonNegative => fischer_burmeister(x[i], f[i]),
            };
        }
        0.5 * dot(phi, phi)
    }

    fn line_search<P: Complementarity + ?Sized>(
        &self,
        problem: &P,
        bounds: &[Bound],
        x: &[f64],
        direction: &[f64],
        merit: f64,
        slope: f64,
    ) -> Option<Vec<f64>> {
        let n = x.len();
        let mut f = vec![0.0; n];
        let mut phi = vec![0.0; n];
        let mut step = 1.0;
        while step >= self.options.min_step {
            let candidate: Vec<f64> = x
                .iter()
                .zip(direction)
                .map(|(xi, di)| xi + step * di)
                .collect();
            let trial = self.evaluate(problem, bounds, &candidate, &mut f, &mut phi);
            if trial.is_finite() && trial <= merit + self.options.armijo * step * slope {
                return Some(candidate);
            }
            step *= self.options.backtrack;
        }
        None
    }
}

impl Default for McpSolver {
    fn default() -> Self {
        Self::new(McpOptions::default())
    }
}

/// An element of the generalized Jacobian of `Phi`.
fn newton_matrix(bounds: &[Bound], x: &[f64], f: &[f64], jac: &[f64], h: &mut [f64]) {
    let n = x.len();
    h.iter_mut().for_each(|v| *v = 0.0);
    for (i, bound) in bounds.iter().enumerate() {
        let row = &mut h[i * n..(i + 1) * n];
        match bound {
            Bound::Fixed(_) => row[i] = 1.0,
            Bound::NonNegative => {
                let r = x[i].hypot(f[i]);
                let (da, db) = if r < KINK_RADIUS {
                    let d = 1.0 - std::f64::consts::FRAC_1_SQRT_2;
                    (d, d)
                } else {
                    (1.0 - x[i] / r, 1.0 - f[i] / r)
                };
                for (j, value) in row.iter_mut().enumerate() {
                    *value = db * jac[i * n + j];
                }
                row[i] += da;
            }
        }
    }
}

fn transpose_times(h: &[f64], v: &[f64], n: usize) -> Vec<f64> {
    let mut out = vec![0.0; n];
    for i in 0..n {
        for j in 0..n {
            out[j] += h[i * n + j] * v[i];
        }
    }
    out
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn inf_norm(v: &[f64]) -> f64 {
    v.iter().fold(0.0_f64, |acc, x| {
        if x.is_nan() {
            f64::NAN
        } else {
            acc.max(x.abs())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `F(x) = M x + q` with dense `M`.
    struct Lcp {
        m: Vec<f64>,
        q: Vec<f64>,
        bounds: Vec<Bound>,
    }

    impl Lcp {
        fn new(m: Vec<f64>, q: Vec<f64>) -> Self {
            let bounds = vec![Bound::NonNegative; q.len()];
            Self { m, q, bounds }
        }
    }

    impl Complementarity for Lcp {
        fn dimension(&self) -> usize {
            self.q.len()
        }

        fn bounds(&self) -> Vec<Bound> {
            self.bounds.clone()
        }

        fn residual(&self, x: &[f64], out: &mut [f64]) {
            let n = self.q.len();
            for i in 0..n {
                out[i] = self.q[i] + (0..n).map(|j| self.m[i * n + j] * x[j]).sum::<f64>();
            }
        }

        fn jacobian(&self, _x: &[f64], jac: &mut [f64]) {
            jac.copy_from_slice(&self.m);
        }
    }

    #[test]
    fn fb_function_zero_iff_complementary() {
        assert_eq!(fischer_burmeister(0.0, 3.0), 0.0);
        assert_eq!(fischer_burmeister(2.0, 0.0), 0.0);
        assert!(fischer_burmeister(1.0, 1.0) > 0.0);
        assert!(fischer_burmeister(-1.0, 2.0) < 0.0);
    }

    #[test]
    fn solves_two_by_two_lcp() {
        // x1 interior, x2 at its bound: x = (1, 0), F = (0, 1)
        let lcp = Lcp::new(vec![2.0, 1.0, 1.0, 2.0], vec![-2.0, 0.0]);
        let solution = McpSolver::default().solve(&lcp, &[0.0, 0.0]).unwrap();
        assert!(solution.converged);
        assert!((solution.x[0] - 1.0).abs() < 1e-8);
        assert!(solution.x[1].abs() < 1e-8);
        assert!((solution.residual[1] - 1.0).abs() < 1e-8);
    }

    #[test]
    fn degenerate_start_at_kink() {
        // Solution x = (0.5, 0.5) from the origin where q = -1 forces both active
        let lcp = Lcp::new(vec![1.0, 1.0, 0.0, 2.0], vec![-1.0, -1.0]);
        let solution = McpSolver::default().solve(&lcp, &[0.0, 0.0]).unwrap();
        assert!((solution.x[1] - 0.5).abs() < 1e-8);
        assert!((solution.x[0] - 0.5).abs() < 1e-8);
    }

    #[test]
    fn both_backends_converge() {
        let lcp = Lcp::new(
            vec![4.0, -1.0, 0.0, -1.0, 4.0, -1.0, 0.0, -1.0, 4.0],
            vec![-3.0, 5.0, -3.0],
        );
        for kind in [LinearSolverKind::Gauss, LinearSolverKind::Faer] {
            let solver = McpSolver::new(McpOptions {
                linear_solver: kind,
                ..McpOptions::default()
            });
            let solution = solver.solve(&lcp, &[1.0, 1.0, 1.0]).unwrap();
            assert!((solution.x[0] - 0.75).abs() < 1e-8, "{kind}: {:?}", solution.x);
            assert!(solution.x[1].abs() < 1e-8);
            assert!((solution.x[2] - 0.75).abs() < 1e-8);
        }
    }

    #[test]
    fn pinned_variable_stays_pinned() {
        let mut lcp = Lcp::new(vec![2.0, 1.0, 1.0, 2.0], vec![-2.0, -4.0]);
        lcp.bounds[1] = Bound::Fixed(3.0);
        let solution = McpSolver::default().solve(&lcp, &[0.0, 0.0]).unwrap();
        assert_eq!(solution.x[1], 3.0);
        // F1 = 2 x1 + 3 - 2 > 0 so x1 = 0
        assert!(solution.x[0].abs() < 1e-8);
    }

    #[test]
    fn zero_iterations_only_evaluates() {
        let lcp = Lcp::new(vec![2.0, 1.0, 1.0, 2.0], vec![-2.0, 0.0]);
        let solver = McpSolver::new(McpOptions {
            max_iterations: 0,
            ..McpOptions::default()
        });
        let at_start = solver.run(&lcp, &[0.0, 0.0]).unwrap();
        assert_eq!(at_start.iterations, 0);
        assert_eq!(at_start.x, vec![0.0, 0.0]);
        assert!(!at_start.converged);

        let at_solution = solver.run(&lcp, &[1.0, 0.0]).unwrap();
        assert!(at_solution.converged);
        assert!(matches!(
            solver.solve(&lcp, &[0.0, 0.0]),
            Err(EquilibriumError::NotConverged { iterations: 0, .. })
        ));
    }

    #[test]
    fn infeasible_lcp_reports_not_converged() {
        // F(x) = -x - 1 has no complementary solution
        let lcp = Lcp::new(vec![-1.0], vec![-1.0]);
        let solver = McpSolver::new(McpOptions {
            max_iterations: 50,
            ..McpOptions::default()
        });
        assert!(matches!(
            solver.solve(&lcp, &[1.0]),
            Err(EquilibriumError::NotConverged { .. })
        ));
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let lcp = Lcp::new(vec![1.0], vec![0.0]);
        assert!(matches!(
            McpSolver::default().run(&lcp, &[0.0, 1.0]),
            Err(EquilibriumError::Dimension(_))
        ));
    }
}
