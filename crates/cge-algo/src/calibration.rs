//! Benchmark calibration as a cost-minimizing dispatch LP.
//!
//! ```text
//! min  Σ_i c_i Y_i          c_i = Σ_f abar[t(i),f] (vbar_f + tau_if)
//! s.t. Σ_i Y_i >= dbar      (dual: pbar)
//!      0 <= Y_i <= ylim_i   (dual: rbar_i)
//! ```
//!
//! The LP has a single coupling constraint, so its vertex duals follow from
//! complementary slackness on the merit order: the marginal plant sets the
//! steel price and every cheaper dispatched plant earns the cost difference as
//! a capacity rent.

use cge_core::{Factor, FactorTable, PlantId, SteelData};
use good_lp::solvers::clarabel::clarabel;
use good_lp::{
    constraint, variable, Expression, ProblemVariables, ResolutionError, Solution, SolverModel,
    Variable,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::CalibrationError;

/// Relative tolerance for classifying LP outputs and checking optimality.
const LP_TOLERANCE: f64 = 1e-6;

/// Calibrated benchmark: prices, quantities and rents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Reference steel price
    pub pbar: f64,
    /// Capacity rent per plant
    pub rbar: Vec<f64>,
    /// Reference output per plant
    pub ybar: Vec<f64>,
    /// Reference factor demand
    pub hbar: FactorTable<f64>,
    /// Reference emissions by factor
    pub ebar: FactorTable<f64>,
    /// Benchmark unit cost per plant
    pub unit_cost: Vec<f64>,
    pub total_cost: f64,
    /// Plant setting the steel price
    pub marginal_plant: Option<PlantId>,
}

impl Calibration {
    pub fn total_output(&self) -> f64 {
        self.ybar.iter().sum()
    }

    pub fn benchmark_emissions(&self) -> f64 {
        self.ebar.0.iter().sum()
    }

    /// Whether this calibration was computed from `data`.
    ///
    /// Checks every input the calibration depends on: plant count, unit costs,
    /// capacities, demand and the emission coefficients behind `ebar`.
    pub fn is_consistent_with(&self, data: &SteelData) -> bool {
        let n = data.plants.len();
        if self.ybar.len() != n || self.rbar.len() != n || self.unit_cost.len() != n {
            return false;
        }
        let close = |a: f64, b: f64| (a - b).abs() <= LP_TOLERANCE * a.abs().max(b.abs()).max(1.0);

        let plants_match = data.plants.iter().enumerate().all(|(i, plant)| {
            close(self.unit_cost[i], data.unit_cost(plant))
                && self.ybar[i] <= plant.ylim * (1.0 + LP_TOLERANCE)
        });
        let hbar = data.factor_use(&self.ybar);
        let factors_match = Factor::ALL.into_iter().all(|f| {
            close(self.hbar[f], hbar[f]) && close(self.ebar[f], data.factors[f].kappa * hbar[f])
        });
        plants_match && factors_match && close(self.total_output(), data.dbar)
    }
}

/// Solve the calibration LP and derive the benchmark quantities.
pub fn calibrate(data: &SteelData) -> Result<Calibration, CalibrationError> {
    data.validate()
        .map_err(|e| CalibrationError::InvalidData(e.to_string()))?;

    let capacity = data.total_capacity();
    if capacity < data.dbar * (1.0 - LP_TOLERANCE) {
        return Err(CalibrationError::Infeasible {
            capacity,
            demand: data.dbar,
        });
    }

    let costs: Vec<f64> = data.plants.iter().map(|p| data.unit_cost(p)).collect();
    let ylim: Vec<f64> = data.plants.iter().map(|p| p.ylim).collect();

    let lp_output = solve_dispatch_lp(&costs, &ylim, data.dbar)?;
    let lp_cost = dot(&costs, &lp_output);

    // Crossover: move the interior-point optimum onto the basic solution that
    // defines the duals.
    let ybar = merit_order_dispatch(&costs, &ylim, data.dbar, Some(&lp_output));
    let total_cost = dot(&costs, &ybar);
    if (total_cost - lp_cost).abs() > LP_TOLERANCE * lp_cost.abs().max(1.0) {
        return Err(CalibrationError::NotOptimal(format!(
            "LP objective {lp_cost:.6} differs from merit-order cost {total_cost:.6}"
        )));
    }

    let duals = merit_order_duals(&costs, &ylim, &ybar);
    let hbar = data.factor_use(&ybar);
    let ebar = FactorTable::from_fn(|f: Factor| data.factors[f].kappa * hbar[f]);
    let marginal_plant = duals.marginal.map(|i| data.plants[i].id);

    info!(
        pbar = duals.price,
        total_cost,
        marginal = ?marginal_plant,
        "calibration solved"
    );

    Ok(Calibration {
        pbar: duals.price,
        rbar: duals.rents,
        ybar,
        hbar,
        ebar,
        unit_cost: costs,
        total_cost,
        marginal_plant,
    })
}

fn solve_dispatch_lp(costs: &[f64], ylim: &[f64], demand: f64) -> Result<Vec<f64>, CalibrationError> {
    let mut vars = ProblemVariables::new();
    let y: Vec<Variable> = ylim
        .iter()
        .map(|&cap| vars.add(variable().min(0.0).max(cap)))
        .collect();

    let objective = y
        .iter()
        .zip(costs)
        .fold(Expression::from(0.0), |acc, (v, c)| acc + *c * *v);
    let supply = y.iter().fold(Expression::from(0.0), |acc, v| acc + *v);

    let solution = vars
        .minimise(objective)
        .using(clarabel)
        .with(constraint!(supply >= demand))
        .solve()
        .map_err(|e| match e {
            ResolutionError::Infeasible => CalibrationError::Infeasible {
                capacity: ylim.iter().sum(),
                demand,
            },
            other => CalibrationError::NotOptimal(format!("LP solver failed: {other:?}")),
        })?;

    let output: Vec<f64> = y.iter().map(|v| solution.value(*v)).collect();
    let supplied: f64 = output.iter().sum();
    if supplied < demand - LP_TOLERANCE * demand.max(1.0) {
        return Err(CalibrationError::NotOptimal(format!(
            "LP output {supplied:.6} does not meet demand {demand:.6}"
        )));
    }
    debug!(supplied, demand, "dispatch LP solved");
    Ok(output)
}

/// Fill demand from the cheapest plant upward.
///
/// Ties in cost are broken in favour of the plant with larger `hint` output so
/// that the result stays on the face the LP solver chose.
pub fn merit_order_dispatch(
    costs: &[f64],
    ylim: &[f64],
    demand: f64,
    hint: Option<&[f64]>,
) -> Vec<f64> {
    let mut order: Vec<usize> = (0..costs.len()).collect();
    order.sort_by(|&a, &b| {
        costs[a].total_cmp(&costs[b]).then_with(|| match hint {
            Some(h) => h[b].total_cmp(&h[a]),
            None => a.cmp(&b),
        })
    });

    let mut output = vec![0.0; costs.len()];
    let mut remaining = demand;
    for i in order {
        if remaining <= 0.0 {
            break;
        }
        let q = ylim[i].min(remaining);
        output[i] = q;
        remaining -= q;
    }
    output
}

/// Shadow prices of the dispatch LP.
#[derive(Debug, Clone, PartialEq)]
pub struct MeritOrderDuals {
    pub price: f64,
    pub rents: Vec<f64>,
    /// Index of the partially loaded plant, if any
    pub marginal: Option<usize>,
}

/// Recover the demand and capacity duals from a basic optimal dispatch.
pub fn merit_order_duals(costs: &[f64], ylim: &[f64], output: &[f64]) -> MeritOrderDuals {
    let eps = |cap: f64| LP_TOLERANCE * cap.max(1.0);
    let marginal = (0..costs.len())
        .filter(|&i| output[i] > eps(ylim[i]) && output[i] < ylim[i] - eps(ylim[i]))
        .min_by(|&a, &b| costs[a].total_cmp(&costs[b]));

    let price = match marginal {
        Some(i) => costs[i],
        None => (0..costs.len())
            .filter(|&i| output[i] > eps(ylim[i]))
            .map(|i| costs[i])
            .fold(0.0, f64::max),
    };

    let rents = (0..costs.len())
        .map(|i| {
            if output[i] > eps(ylim[i]) {
                (price - costs[i]).max(0.0)
            } else {
                0.0
            }
        })
        .collect();

    MeritOrderDuals {
        price,
        rents,
        marginal,
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_fills_cheapest_first() {
        let costs = [30.0, 10.0, 20.0];
        let ylim = [5.0, 4.0, 4.0];
        let y = merit_order_dispatch(&costs, &ylim, 10.0, None);
        assert_eq!(y, vec![2.0, 4.0, 4.0]);

        let duals = merit_order_duals(&costs, &ylim, &y);
        assert_eq!(duals.marginal, Some(0));
        assert_eq!(duals.price, 30.0);
        assert_eq!(duals.rents, vec![0.0, 20.0, 10.0]);
    }

    #[test]
    fn exact_fit_prices_at_most_expensive_dispatched() {
        let costs = [30.0, 10.0, 20.0];
        let ylim = [5.0, 4.0, 4.0];
        let y = merit_order_dispatch(&costs, &ylim, 8.0, None);
        assert_eq!(y, vec![0.0, 4.0, 4.0]);

        let duals = merit_order_duals(&costs, &ylim, &y);
        assert_eq!(duals.marginal, None);
        assert_eq!(duals.price, 20.0);
        assert_eq!(duals.rents, vec![0.0, 10.0, 0.0]);
    }

    #[test]
    fn tie_break_follows_hint() {
        let costs = [10.0, 10.0];
        let ylim = [5.0, 5.0];
        let y = merit_order_dispatch(&costs, &ylim, 6.0, Some(&[1.0, 5.0]));
        assert_eq!(y, vec![1.0, 5.0]);
    }

    #[test]
    fn lp_matches_merit_order() {
        let costs = [30.0, 10.0, 20.0];
        let ylim = [5.0, 4.0, 4.0];
        let y = solve_dispatch_lp(&costs, &ylim, 10.0).unwrap();
        assert!((y[0] - 2.0).abs() < 1e-4);
        assert!((y[1] - 4.0).abs() < 1e-4);
        assert!((y[2] - 4.0).abs() < 1e-4);
    }
}
