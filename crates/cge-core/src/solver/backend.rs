use anyhow::{anyhow, bail, Result};
use faer::{prelude::*, solvers::PartialPivLu, Mat};

/// Pivot magnitude below which a matrix is treated as singular.
const SINGULAR_PIVOT: f64 = 1e-14;

/// Solves square dense systems `A x = b`.
///
/// Matrices are passed row-major as `n * n` slices; Newton Jacobians in this
/// workspace are small (a few dozen rows) so dense storage is the simplest fit.
pub trait LinearSystemBackend: Send + Sync {
    fn solve(&self, matrix: &[f64], n: usize, rhs: &[f64]) -> Result<Vec<f64>>;
}

fn check_shape(matrix: &[f64], n: usize, rhs: &[f64]) -> Result<()> {
    if matrix.len() != n * n {
        bail!(
            "matrix has {} entries, expected {} for a {}x{} system",
            matrix.len(),
            n * n,
            n,
            n
        );
    }
    if rhs.len() != n {
        bail!("rhs length ({}) does not match matrix dimension {}", rhs.len(), n);
    }
    Ok(())
}

/// Gaussian elimination with partial pivoting and back substitution.
#[derive(Debug, Clone, Default)]
pub struct GaussSolver;

impl LinearSystemBackend for GaussSolver {
    fn solve(&self, matrix: &[f64], n: usize, rhs: &[f64]) -> Result<Vec<f64>> {
        check_shape(matrix, n, rhs)?;
        if n == 0 {
            return Ok(Vec::new());
        }

        let mut a = matrix.to_vec();
        let mut b = rhs.to_vec();

        for col in 0..n {
            let pivot = (col..n)
                .max_by(|&r, &s| a[r * n + col].abs().total_cmp(&a[s * n + col].abs()))
                .unwrap_or(col);
            if a[pivot * n + col].abs() < SINGULAR_PIVOT {
                bail!("singular matrix (zero pivot in column {col})");
            }
            if pivot != col {
                for k in 0..n {
                    a.swap(col * n + k, pivot * n + k);
                }
                b.swap(col, pivot);
            }
            let diag = a[col * n + col];
            for row in col + 1..n {
                let factor = a[row * n + col] / diag;
                if factor == 0.0 {
                    continue;
                }
                for k in col..n {
                    a[row * n + k] -= factor * a[col * n + k];
                }
                b[row] -= factor * b[col];
            }
        }

        let mut x = vec![0.0; n];
        for row in (0..n).rev() {
            let tail: f64 = (row + 1..n).map(|k| a[row * n + k] * x[k]).sum();
            x[row] = (b[row] - tail) / a[row * n + row];
        }
        Ok(x)
    }
}

/// LU decomposition with partial pivoting from `faer`.
#[derive(Debug, Clone, Default)]
pub struct FaerSolver;

impl LinearSystemBackend for FaerSolver {
    fn solve(&self, matrix: &[f64], n: usize, rhs: &[f64]) -> Result<Vec<f64>> {
        check_shape(matrix, n, rhs)?;
        if n == 0 {
            return Ok(Vec::new());
        }

        let mat = Mat::from_fn(n, n, |i, j| matrix[i * n + j]);
        let rhs_mat = Mat::from_fn(n, 1, |i, _| rhs[i]);
        let lu = PartialPivLu::new(mat.as_ref());
        let sol = lu.solve(&rhs_mat);

        let x: Vec<f64> = (0..n).map(|i| sol.read(i, 0)).collect();
        if x.iter().any(|v| !v.is_finite()) {
            return Err(anyhow!("singular matrix (faer LU produced non-finite values)"));
        }
        Ok(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gauss_pivots_on_zero_diagonal() {
        let a = [0.0, 1.0, 1.0, 0.0];
        let x = GaussSolver.solve(&a, 2, &[3.0, 5.0]).unwrap();
        assert!((x[0] - 5.0).abs() < 1e-12);
        assert!((x[1] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn gauss_rejects_singular() {
        let a = [1.0, 2.0, 2.0, 4.0];
        assert!(GaussSolver.solve(&a, 2, &[1.0, 2.0]).is_err());
    }

    #[test]
    fn shape_mismatch_is_reported() {
        assert!(FaerSolver.solve(&[1.0, 0.0, 0.0], 2, &[1.0, 1.0]).is_err());
        assert!(GaussSolver.solve(&[1.0], 1, &[1.0, 1.0]).is_err());
    }

    #[test]
    fn backends_agree_on_dense_system() {
        let a = [4.0, -2.0, 1.0, -2.0, 4.0, -2.0, 1.0, -2.0, 4.0];
        let b = [11.0, -16.0, 17.0];
        let gauss = GaussSolver.solve(&a, 3, &b).unwrap();
        let faer = FaerSolver.solve(&a, 3, &b).unwrap();
        for (g, f) in gauss.iter().zip(faer.iter()) {
            assert!((g - f).abs() < 1e-10, "gauss={g}, faer={f}");
        }
        assert!((gauss[0] - 1.0).abs() < 1e-10);
        assert!((gauss[1] + 2.0).abs() < 1e-10);
        assert!((gauss[2] - 3.0).abs() < 1e-10);
    }
}
