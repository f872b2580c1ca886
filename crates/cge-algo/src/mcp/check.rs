use serde::Serialize;

use super::problem::{Bound, Complementarity};

/// Complementarity status of one pair at a candidate solution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairCheck {
    pub name: String,
    pub variable: f64,
    pub residual: f64,
    /// `min(|F|, |x|)`, or `|x - value|` for a pinned variable
    pub gap: f64,
    /// Either element is negative beyond tolerance
    pub negative: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplementarityReport {
    pub pairs: Vec<PairCheck>,
    pub tolerance: f64,
}

impl ComplementarityReport {
    pub fn is_valid(&self) -> bool {
        self.pairs
            .iter()
            .all(|p| !p.negative && p.gap <= self.tolerance)
    }

    pub fn max_gap(&self) -> f64 {
        self.pairs.iter().map(|p| p.gap).fold(0.0, f64::max)
    }

    pub fn violations(&self) -> impl Iterator<Item = &PairCheck> {
        self.pairs
            .iter()
            .filter(move |p| p.negative || p.gap > self.tolerance)
    }
}

/// Check every pair of `problem` at `x`.
pub fn check_complementarity<P: Complementarity + ?Sized>(
    problem: &P,
    x: &[f64],
    tolerance: f64,
) -> ComplementarityReport {
    let n = problem.dimension();
    let mut residual = vec![0.0; n];
    problem.residual(x, &mut residual);

    let pairs = problem
        .bounds()
        .into_iter()
        .enumerate()
        .map(|(i, bound)| {
            let (gap, negative) = match bound {
                Bound::Fixed(value) => ((x[i] - value).abs(), false),
                Bound::NonNegative => (
                    residual[i].abs().min(x[i].abs()),
                    x[i] < -tolerance || residual[i] < -tolerance,
                ),
            };
            PairCheck {
                name: problem.variable_name(i),
                variable: x[i],
                residual: residual[i],
                gap,
                negative,
            }
        })
        .collect();

    ComplementarityReport { pairs, tolerance }
}
