/// Bound on a complementarity variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    /// `x >= 0`, complementary to `F(x) >= 0`
    NonNegative,
    /// `x = value`; the residual is ignored
    Fixed(f64),
}

/// A square complementarity system.
///
/// Jacobians are dense and row-major: entry `(i, j)` is `dF_i / dx_j` at
/// `jac[i * n + j]`.
pub trait Complementarity {
    fn dimension(&self) -> usize;

    fn bounds(&self) -> Vec<Bound>;

    fn residual(&self, x: &[f64], out: &mut [f64]);

    fn jacobian(&self, x: &[f64], jac: &mut [f64]);

    /// Label of the variable in pair `i`, used in reports and logs.
    fn variable_name(&self, i: usize) -> String {
        format!("x[{i}]")
    }
}

/// Clamp free variables at zero and reset pinned ones to their value.
///
/// Newton iterates that converged within tolerance can leave a variable that
/// belongs at its bound a few ulps below zero.
pub fn project_onto_bounds(bounds: &[Bound], x: &[f64]) -> Vec<f64> {
    x.iter()
        .zip(bounds)
        .map(|(&v, bound)| match bound {
            Bound::NonNegative => v.max(0.0),
            Bound::Fixed(value) => *value,
        })
        .collect()
}

/// Forward-difference Jacobian, for checking analytic implementations.
pub fn finite_difference_jacobian<P: Complementarity + ?Sized>(
    problem: &P,
    x: &[f64],
    step: f64,
) -> Vec<f64> {
    let n = problem.dimension();
    let mut base = vec![0.0; n];
    problem.residual(x, &mut base);

    let mut jac = vec![0.0; n * n];
    let mut shifted = x.to_vec();
    let mut out = vec![0.0; n];
    for j in 0..n {
        let h = step * x[j].abs().max(1.0);
        shifted[j] = x[j] + h;
        problem.residual(&shifted, &mut out);
        for i in 0..n {
            jac[i * n + j] = (out[i] - base[i]) / h;
        }
        shifted[j] = x[j];
    }
    jac
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_clamps_free_and_resets_pinned() {
        let bounds = [Bound::NonNegative, Bound::NonNegative, Bound::Fixed(10.0)];
        let x = project_onto_bounds(&bounds, &[-4.8e-9, 3.0, 9.999]);
        assert_eq!(x, vec![0.0, 3.0, 10.0]);
    }
}
