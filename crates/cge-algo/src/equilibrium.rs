//! Steel market equilibrium as a mixed complementarity problem.
//!
//! | Pair                 | Residual (>= 0)                                        | Variable |
//! |----------------------|--------------------------------------------------------|----------|
//! | zero profit, plant i | `Σ_f a (V_f + tau_if) + R_i + W e_i - P`               | `Y_i`    |
//! | steel market         | `Σ_i Y_i - dbar (1 + eps (P / pbar - 1))`              | `P`      |
//! | factor market f      | `hbar_f (1 + rho_f (V_f / vbar_f - 1)) - Σ_i a Y_i`    | `V_f`    |
//! | capacity, plant i    | `ylim_i - Y_i`                                         | `R_i`    |
//! | emissions cap        | `chi Σ_f ebar_f - Σ_i e_i Y_i`                         | `W`      |
//!
//! `e_i = Σ_f kappa_f a` is the emission intensity of plant i. Outside a cap
//! policy `W` is pinned to zero or to the tax level.

use cge_core::{Factor, FactorTable, Policy, ScenarioConfig, SteelData};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::calibration::Calibration;
use crate::error::EquilibriumError;
use crate::mcp::{
    check_complementarity, project_onto_bounds, Bound, Complementarity, McpOptions, McpSolver,
};

const FACTORS: usize = Factor::ALL.len();

/// Tolerance used when checking complementarity of a converged point.
pub const COMPLEMENTARITY_TOLERANCE: f64 = 1e-6;

/// Variable positions in the stacked MCP vector.
#[derive(Debug, Clone, Copy)]
struct Layout {
    plants: usize,
}

impl Layout {
    fn dimension(self) -> usize {
        2 * self.plants + FACTORS + 2
    }

    fn output(self, i: usize) -> usize {
        i
    }

    fn price(self) -> usize {
        self.plants
    }

    fn factor_price(self, f: Factor) -> usize {
        self.plants + 1 + f.index()
    }

    fn rent(self, i: usize) -> usize {
        self.plants + 1 + FACTORS + i
    }

    fn carbon_price(self) -> usize {
        2 * self.plants + 1 + FACTORS
    }
}

/// Prices and quantities of one equilibrium.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquilibriumPoint {
    pub output: Vec<f64>,
    pub steel_price: f64,
    pub factor_prices: FactorTable<f64>,
    pub rents: Vec<f64>,
    pub carbon_price: f64,
}

impl EquilibriumPoint {
    /// The calibrated benchmark with a zero carbon price.
    pub fn benchmark(data: &SteelData, calibration: &Calibration) -> Self {
        Self {
            output: calibration.ybar.clone(),
            steel_price: calibration.pbar,
            factor_prices: FactorTable::from_fn(|f| data.factors[f].vbar),
            rents: calibration.rbar.clone(),
            carbon_price: 0.0,
        }
    }

    fn to_vector(&self) -> Vec<f64> {
        let layout = Layout {
            plants: self.output.len(),
        };
        let mut x = vec![0.0; layout.dimension()];
        for (i, y) in self.output.iter().enumerate() {
            x[layout.output(i)] = *y;
        }
        x[layout.price()] = self.steel_price;
        for (f, v) in self.factor_prices.iter() {
            x[layout.factor_price(f)] = *v;
        }
        for (i, r) in self.rents.iter().enumerate() {
            x[layout.rent(i)] = *r;
        }
        x[layout.carbon_price()] = self.carbon_price;
        x
    }

    fn from_vector(plants: usize, x: &[f64]) -> Self {
        let layout = Layout { plants };
        Self {
            output: (0..plants).map(|i| x[layout.output(i)]).collect(),
            steel_price: x[layout.price()],
            factor_prices: FactorTable::from_fn(|f| x[layout.factor_price(f)]),
            rents: (0..plants).map(|i| x[layout.rent(i)]).collect(),
            carbon_price: x[layout.carbon_price()],
        }
    }

    pub fn production(&self) -> f64 {
        self.output.iter().sum()
    }
}

/// The steel MCP for one policy.
pub struct SteelMcp<'a> {
    data: &'a SteelData,
    calibration: &'a Calibration,
    policy: Policy,
    layout: Layout,
    intensity: Vec<f64>,
    emissions_target: f64,
}

impl<'a> SteelMcp<'a> {
    pub fn new(
        data: &'a SteelData,
        calibration: &'a Calibration,
        policy: Policy,
    ) -> Result<Self, EquilibriumError> {
        policy
            .validate()
            .map_err(|e| EquilibriumError::InvalidScenario(e.to_string()))?;
        let plants = data.plants.len();
        if calibration.ybar.len() != plants || calibration.rbar.len() != plants {
            return Err(EquilibriumError::Dimension(format!(
                "calibration covers {} plants, dataset has {}",
                calibration.ybar.len(),
                plants
            )));
        }

        let intensity = data
            .plants
            .iter()
            .map(|p| data.emission_intensity(p.technology))
            .collect();
        let chi = match policy {
            Policy::EmissionsCap { fraction } => fraction,
            _ => data.chi,
        };

        Ok(Self {
            data,
            calibration,
            policy,
            layout: Layout { plants },
            intensity,
            emissions_target: chi * calibration.benchmark_emissions(),
        })
    }

    pub fn emissions_target(&self) -> f64 {
        self.emissions_target
    }
}

impl Complementarity for SteelMcp<'_> {
    fn dimension(&self) -> usize {
        self.layout.dimension()
    }

    fn bounds(&self) -> Vec<Bound> {
        let mut bounds = vec![Bound::NonNegative; self.dimension()];
        if let Some(price) = self.policy.pinned_carbon_price() {
            bounds[self.layout.carbon_price()] = Bound::Fixed(price);
        }
        bounds
    }

    fn residual(&self, x: &[f64], out: &mut [f64]) {
        let l = self.layout;
        let data = self.data;
        let cal = self.calibration;
        let p = x[l.price()];
        let w = x[l.carbon_price()];

        let mut supply = 0.0;
        let mut emissions = 0.0;
        let mut factor_use = [0.0; FACTORS];
        for (i, plant) in data.plants.iter().enumerate() {
            let y = x[l.output(i)];
            let mut cost = 0.0;
            for f in Factor::ALL {
                let a = data.coefficient(plant, f);
                cost += a * (x[l.factor_price(f)] + plant.tau[f]);
                factor_use[f.index()] += a * y;
            }
            out[l.output(i)] = cost + x[l.rent(i)] + w * self.intensity[i] - p;
            out[l.rent(i)] = plant.ylim - y;
            supply += y;
            emissions += self.intensity[i] * y;
        }

        out[l.price()] = supply - data.dbar * (1.0 + data.epsilon * (p / cal.pbar - 1.0));

        for f in Factor::ALL {
            let params = &data.factors[f];
            let v = x[l.factor_price(f)];
            out[l.factor_price(f)] =
                cal.hbar[f] * (1.0 + params.rho * (v / params.vbar - 1.0)) - factor_use[f.index()];
        }

        out[l.carbon_price()] = self.emissions_target - emissions;
    }

    fn jacobian(&self, _x: &[f64], jac: &mut [f64]) {
        let l = self.layout;
        let n = l.dimension();
        let data = self.data;
        let cal = self.calibration;
        jac.iter_mut().for_each(|v| *v = 0.0);
        let mut set = |row: usize, col: usize, value: f64| jac[row * n + col] = value;

        for (i, plant) in data.plants.iter().enumerate() {
            let zpf = l.output(i);
            for f in Factor::ALL {
                let a = data.coefficient(plant, f);
                set(zpf, l.factor_price(f), a);
                set(l.factor_price(f), l.output(i), -a);
            }
            set(zpf, l.rent(i), 1.0);
            set(zpf, l.carbon_price(), self.intensity[i]);
            set(zpf, l.price(), -1.0);

            set(l.price(), l.output(i), 1.0);
            set(l.rent(i), l.output(i), -1.0);
            set(l.carbon_price(), l.output(i), -self.intensity[i]);
        }

        set(l.price(), l.price(), -data.dbar * data.epsilon / cal.pbar);

        for f in Factor::ALL {
            let params = &data.factors[f];
            set(
                l.factor_price(f),
                l.factor_price(f),
                cal.hbar[f] * params.rho / params.vbar,
            );
        }
    }

    fn variable_name(&self, i: usize) -> String {
        let l = self.layout;
        let plants = &self.data.plants;
        if i < l.price() {
            format!("Y[{}]", plants[i].id)
        } else if i == l.price() {
            "P".to_string()
        } else if i < l.rent(0) {
            format!("V[{}]", Factor::ALL[i - l.factor_price(Factor::Iore)])
        } else if i < l.carbon_price() {
            format!("R[{}]", plants[i - l.rent(0)].id)
        } else {
            "W".to_string()
        }
    }
}

/// A solved scenario with its summary quantities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario: ScenarioConfig,
    pub point: EquilibriumPoint,
    pub production: f64,
    pub emissions: f64,
    pub factor_demand: FactorTable<f64>,
    pub iterations: usize,
    pub residual_norm: f64,
    /// Largest `min(|F|, |x|)` over all pairs
    pub complementarity_gap: f64,
}

/// Build a fresh MCP for `config` and solve it from `warm_start` (or the
/// benchmark when absent).
pub fn solve_scenario(
    data: &SteelData,
    calibration: &Calibration,
    config: &ScenarioConfig,
    warm_start: Option<&EquilibriumPoint>,
    options: &McpOptions,
) -> Result<ScenarioResult, EquilibriumError> {
    let problem = SteelMcp::new(data, calibration, config.policy)?;
    let start = match warm_start {
        Some(point) => point.clone(),
        None => EquilibriumPoint::benchmark(data, calibration),
    };
    if start.output.len() != data.plants.len() {
        return Err(EquilibriumError::Dimension(format!(
            "warm start covers {} plants, dataset has {}",
            start.output.len(),
            data.plants.len()
        )));
    }

    debug!(scenario = %config.name, policy = %config.policy, "solving scenario");
    let solver = McpSolver::new(options.clone());
    let solution = solver.solve(&problem, &start.to_vector())?;

    let report = check_complementarity(&problem, &solution.x, COMPLEMENTARITY_TOLERANCE);
    if let Some(bad) = report.violations().next() {
        warn!(pair = %bad.name, gap = bad.gap, "converged point violates complementarity");
        return Err(EquilibriumError::NotConverged {
            iterations: solution.iterations,
            residual: report.max_gap(),
        });
    }

    let x = project_onto_bounds(&problem.bounds(), &solution.x);
    let point = EquilibriumPoint::from_vector(data.plants.len(), &x);
    let production = point.production();
    let emissions = data.emissions(&point.output);
    info!(
        scenario = %config.name,
        iterations = solution.iterations,
        production,
        emissions,
        steel_price = point.steel_price,
        carbon_price = point.carbon_price,
        "scenario solved"
    );

    Ok(ScenarioResult {
        scenario: config.clone(),
        factor_demand: data.factor_use(&point.output),
        point,
        production,
        emissions,
        iterations: solution.iterations,
        residual_norm: solution.phi_norm,
        complementarity_gap: report.max_gap(),
    })
}

/// Evaluate the benchmark MCP at the calibrated point without iterating.
///
/// Returns `||Phi||_inf`, or a replication error when it exceeds `tolerance`.
pub fn replicate_benchmark(
    data: &SteelData,
    calibration: &Calibration,
    options: &McpOptions,
    tolerance: f64,
) -> Result<f64, EquilibriumError> {
    let problem = SteelMcp::new(data, calibration, Policy::Benchmark)?;
    let start = EquilibriumPoint::benchmark(data, calibration).to_vector();
    let solver = McpSolver::new(McpOptions {
        max_iterations: 0,
        ..options.clone()
    });
    let evaluation = solver.run(&problem, &start)?;
    if evaluation.phi_norm.is_nan() || evaluation.phi_norm > tolerance {
        return Err(EquilibriumError::Replication {
            residual: evaluation.phi_norm,
            tolerance,
        });
    }
    info!(residual = evaluation.phi_norm, "benchmark replicated");
    Ok(evaluation.phi_norm)
}
