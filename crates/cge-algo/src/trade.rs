//! Multi-region trade with transport costs, solved as an MCP.
//!
//! Matrices are indexed `[source][destination]`. Imports into a destination
//! respond to its composite unit cost
//! `C(d) = Σ_s sha[s][d] PM[s][d] / ref_PM[s][d]`, and final demand responds
//! to the destination price.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::EquilibriumError;
use crate::mcp::{project_onto_bounds, Bound, Complementarity, McpOptions, McpSolver};

/// Benchmark trade data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeData {
    pub regions: Vec<String>,
    /// Benchmark flows `ref_YM[s][d]`
    pub flows: Vec<Vec<f64>>,
    /// Transport cost per unit `tcost[s][d]`
    pub transport_cost: Vec<Vec<f64>>,
    /// Benchmark producer price per region
    pub producer_price: Vec<f64>,
    pub epsilon: f64,
}

impl Default for TradeData {
    /// Two regions: A ships 800 at home and 200 to B, B ships 400 to A and
    /// 1800 at home.
    fn default() -> Self {
        Self {
            regions: vec!["A".to_string(), "B".to_string()],
            flows: vec![vec![800.0, 200.0], vec![400.0, 1800.0]],
            transport_cost: vec![vec![100.0, 60.0], vec![90.0, 0.0]],
            producer_price: vec![190.0, 220.0],
            epsilon: -1.0,
        }
    }
}

impl TradeData {
    pub fn region_index(&self, name: &str) -> Option<usize> {
        self.regions.iter().position(|r| r == name)
    }

    pub fn validate(&self) -> Result<(), EquilibriumError> {
        let n = self.regions.len();
        let square = |m: &Vec<Vec<f64>>| m.len() == n && m.iter().all(|row| row.len() == n);
        if n == 0
            || !square(&self.flows)
            || !square(&self.transport_cost)
            || self.producer_price.len() != n
        {
            return Err(EquilibriumError::Dimension(format!(
                "trade tables must be {n}x{n} with {n} producer prices"
            )));
        }
        let finite_non_negative = |v: &f64| v.is_finite() && *v >= 0.0;
        if !self.flows.iter().flatten().all(finite_non_negative)
            || !self.transport_cost.iter().flatten().all(finite_non_negative)
            || !self.producer_price.iter().all(|p| p.is_finite() && *p > 0.0)
        {
            return Err(EquilibriumError::InvalidScenario(
                "trade flows and costs must be non-negative, prices positive".into(),
            ));
        }
        for d in 0..n {
            if (0..n).map(|s| self.flows[s][d]).sum::<f64>() <= 0.0 {
                return Err(EquilibriumError::InvalidScenario(format!(
                    "region {} has no benchmark absorption",
                    self.regions[d]
                )));
            }
        }
        if !(self.epsilon.is_finite() && self.epsilon <= 0.0) {
            return Err(EquilibriumError::InvalidScenario(format!(
                "trade demand elasticity must be non-positive, got {}",
                self.epsilon
            )));
        }
        Ok(())
    }
}

/// Quantities derived from the benchmark data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeBenchmark {
    /// `ref_PM[s][d] = ref_P[s] + tcost[s][d]`
    pub import_price: Vec<Vec<f64>>,
    /// `ref_YA[d] = Σ_s ref_YM[s][d]`
    pub absorption: Vec<f64>,
    /// Value-weighted destination price `ref_PA[d]`
    pub final_price: Vec<f64>,
    /// Value share `sha[s][d]` of each source in destination spending
    pub share: Vec<Vec<f64>>,
}

impl TradeBenchmark {
    pub fn new(data: &TradeData) -> Self {
        let n = data.regions.len();
        let import_price: Vec<Vec<f64>> = (0..n)
            .map(|s| {
                (0..n)
                    .map(|d| data.producer_price[s] + data.transport_cost[s][d])
                    .collect()
            })
            .collect();
        let absorption: Vec<f64> = (0..n)
            .map(|d| (0..n).map(|s| data.flows[s][d]).sum())
            .collect();
        let spending: Vec<f64> = (0..n)
            .map(|d| (0..n).map(|s| data.flows[s][d] * import_price[s][d]).sum())
            .collect();
        let final_price = (0..n).map(|d| spending[d] / absorption[d]).collect();
        let share = (0..n)
            .map(|s| {
                (0..n)
                    .map(|d| data.flows[s][d] * import_price[s][d] / spending[d])
                    .collect()
            })
            .collect();

        Self {
            import_price,
            absorption,
            final_price,
            share,
        }
    }
}

/// Trade MCP at given transport costs around a fixed benchmark.
///
/// Variables are stacked as `YM[s][d]`, `PM[s][d]`, `YA[d]`, `PA[d]`.
pub struct TradeMcp<'a> {
    data: &'a TradeData,
    benchmark: &'a TradeBenchmark,
    transport_cost: Vec<Vec<f64>>,
}

impl<'a> TradeMcp<'a> {
    pub fn new(
        data: &'a TradeData,
        benchmark: &'a TradeBenchmark,
        transport_cost: Vec<Vec<f64>>,
    ) -> Self {
        Self {
            data,
            benchmark,
            transport_cost,
        }
    }

    fn regions(&self) -> usize {
        self.data.regions.len()
    }

    fn ym(&self, s: usize, d: usize) -> usize {
        s * self.regions() + d
    }

    fn pm(&self, s: usize, d: usize) -> usize {
        let n = self.regions();
        n * n + s * n + d
    }

    fn ya(&self, d: usize) -> usize {
        let n = self.regions();
        2 * n * n + d
    }

    fn pa(&self, d: usize) -> usize {
        let n = self.regions();
        2 * n * n + n + d
    }

    fn composite_cost(&self, x: &[f64], d: usize) -> f64 {
        let b = self.benchmark;
        (0..self.regions())
            .map(|s| b.share[s][d] * x[self.pm(s, d)] / b.import_price[s][d])
            .sum()
    }

    fn start(&self) -> Vec<f64> {
        let n = self.regions();
        let b = self.benchmark;
        let mut x = vec![0.0; self.dimension()];
        for s in 0..n {
            for d in 0..n {
                x[self.ym(s, d)] = self.data.flows[s][d];
                x[self.pm(s, d)] = b.import_price[s][d];
            }
        }
        for d in 0..n {
            x[self.ya(d)] = b.absorption[d];
            x[self.pa(d)] = b.final_price[d];
        }
        x
    }
}

impl Complementarity for TradeMcp<'_> {
    fn dimension(&self) -> usize {
        let n = self.regions();
        2 * n * n + 2 * n
    }

    fn bounds(&self) -> Vec<Bound> {
        vec![Bound::NonNegative; self.dimension()]
    }

    fn residual(&self, x: &[f64], out: &mut [f64]) {
        let n = self.regions();
        let data = self.data;
        let b = self.benchmark;
        let eps = data.epsilon;
        let cost: Vec<f64> = (0..n).map(|d| self.composite_cost(x, d)).collect();

        for s in 0..n {
            for d in 0..n {
                out[self.ym(s, d)] =
                    x[self.ym(s, d)] - data.flows[s][d] * (1.0 + eps * (cost[d] - 1.0));
                out[self.pm(s, d)] =
                    data.producer_price[s] + self.transport_cost[s][d] - x[self.pm(s, d)];
            }
        }
        for d in 0..n {
            out[self.ya(d)] = x[self.ya(d)]
                - b.absorption[d] * (1.0 + eps * (x[self.pa(d)] / b.final_price[d] - 1.0));
            out[self.pa(d)] = b.final_price[d] * cost[d] - x[self.pa(d)];
        }
    }

    fn jacobian(&self, _x: &[f64], jac: &mut [f64]) {
        let n = self.regions();
        let dim = self.dimension();
        let data = self.data;
        let b = self.benchmark;
        let eps = data.epsilon;
        jac.iter_mut().for_each(|v| *v = 0.0);

        for s in 0..n {
            for d in 0..n {
                let row = self.ym(s, d);
                jac[row * dim + row] = 1.0;
                for k in 0..n {
                    jac[row * dim + self.pm(k, d)] =
                        -data.flows[s][d] * eps * b.share[k][d] / b.import_price[k][d];
                }
                let row = self.pm(s, d);
                jac[row * dim + row] = -1.0;
            }
        }
        for d in 0..n {
            let row = self.ya(d);
            jac[row * dim + row] = 1.0;
            jac[row * dim + self.pa(d)] = -b.absorption[d] * eps / b.final_price[d];

            let row = self.pa(d);
            jac[row * dim + row] = -1.0;
            for k in 0..n {
                jac[row * dim + self.pm(k, d)] =
                    b.final_price[d] * b.share[k][d] / b.import_price[k][d];
            }
        }
    }

    fn variable_name(&self, i: usize) -> String {
        let n = self.regions();
        let r = &self.data.regions;
        if i < n * n {
            format!("YM[{},{}]", r[i / n], r[i % n])
        } else if i < 2 * n * n {
            let k = i - n * n;
            format!("PM[{},{}]", r[k / n], r[k % n])
        } else if i < 2 * n * n + n {
            format!("YA[{}]", r[i - 2 * n * n])
        } else {
            format!("PA[{}]", r[i - 2 * n * n - n])
        }
    }
}

/// A scaling of one route's transport cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostShock {
    pub from: String,
    pub to: String,
    pub factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeScenario {
    pub name: String,
    #[serde(default)]
    pub shocks: Vec<CostShock>,
    /// Only evaluate the benchmark point
    #[serde(default)]
    pub replicate_only: bool,
}

/// Benchmark replication followed by doubling the B to A transport cost.
pub fn default_trade_scenarios() -> Vec<TradeScenario> {
    vec![
        TradeScenario {
            name: "Benchmark".to_string(),
            shocks: Vec::new(),
            replicate_only: true,
        },
        TradeScenario {
            name: "Double_TC_BA".to_string(),
            shocks: vec![CostShock {
                from: "B".to_string(),
                to: "A".to_string(),
                factor: 2.0,
            }],
            replicate_only: false,
        },
    ]
}

/// One reported trade variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRow {
    #[serde(rename = "Scenario")]
    pub scenario: String,
    #[serde(rename = "Variable")]
    pub variable: String,
    #[serde(rename = "Region_From")]
    pub region_from: String,
    #[serde(rename = "Region_To")]
    pub region_to: String,
    #[serde(rename = "Value")]
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeResult {
    pub scenario: String,
    pub iterations: usize,
    pub residual_norm: f64,
    pub rows: Vec<TradeRow>,
}

impl TradeResult {
    pub fn value(&self, variable: &str, from: &str, to: &str) -> Option<f64> {
        self.rows
            .iter()
            .find(|r| r.variable == variable && r.region_from == from && r.region_to == to)
            .map(|r| r.value)
    }
}

/// Solve one trade scenario from the benchmark point.
///
/// Cost shocks change transport costs only; benchmark import prices keep
/// the base costs.
pub fn solve_trade(
    data: &TradeData,
    scenario: &TradeScenario,
    options: &McpOptions,
) -> Result<TradeResult, EquilibriumError> {
    data.validate()?;
    let benchmark = TradeBenchmark::new(data);

    let mut costs = data.transport_cost.clone();
    for shock in &scenario.shocks {
        let (s, d) = data
            .region_index(&shock.from)
            .zip(data.region_index(&shock.to))
            .ok_or_else(|| {
                EquilibriumError::InvalidScenario(format!(
                    "unknown route {} -> {} in trade scenario '{}'",
                    shock.from, shock.to, scenario.name
                ))
            })?;
        if !(shock.factor.is_finite() && shock.factor >= 0.0) {
            return Err(EquilibriumError::InvalidScenario(format!(
                "transport cost factor {} for {} -> {} in trade scenario '{}' must be finite and non-negative",
                shock.factor, shock.from, shock.to, scenario.name
            )));
        }
        costs[s][d] *= shock.factor;
    }

    let problem = TradeMcp::new(data, &benchmark, costs);
    let solver = if scenario.replicate_only {
        McpSolver::new(McpOptions {
            max_iterations: 0,
            ..options.clone()
        })
    } else {
        McpSolver::new(options.clone())
    };
    let solution = solver.solve(&problem, &problem.start())?;
    info!(
        scenario = %scenario.name,
        iterations = solution.iterations,
        residual = solution.phi_norm,
        "trade scenario solved"
    );

    let x = project_onto_bounds(&problem.bounds(), &solution.x);
    let n = data.regions.len();
    let r = &data.regions;
    let mut rows = Vec::with_capacity(problem.dimension());
    let mut push = |variable: &str, from: &str, to: &str, value: f64| {
        rows.push(TradeRow {
            scenario: scenario.name.clone(),
            variable: variable.to_string(),
            region_from: from.to_string(),
            region_to: to.to_string(),
            value,
        })
    };
    for s in 0..n {
        for d in 0..n {
            push("YM", &r[s], &r[d], x[problem.ym(s, d)]);
        }
    }
    for s in 0..n {
        for d in 0..n {
            push("PM", &r[s], &r[d], x[problem.pm(s, d)]);
        }
    }
    for d in 0..n {
        push("YA", "", &r[d], x[problem.ya(d)]);
    }
    for d in 0..n {
        push("PA", "", &r[d], x[problem.pa(d)]);
    }

    Ok(TradeResult {
        scenario: scenario.name.clone(),
        iterations: solution.iterations,
        residual_norm: solution.phi_norm,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::finite_difference_jacobian;

    #[test]
    fn benchmark_prices_and_shares() {
        let data = TradeData::default();
        let b = TradeBenchmark::new(&data);
        assert_eq!(b.import_price, vec![vec![290.0, 250.0], vec![310.0, 220.0]]);
        assert_eq!(b.absorption, vec![1200.0, 2000.0]);
        assert!((b.final_price[0] - 356_000.0 / 1200.0).abs() < 1e-9);
        assert!((b.final_price[1] - 223.0).abs() < 1e-9);
        for d in 0..2 {
            let total: f64 = (0..2).map(|s| b.share[s][d]).sum();
            assert!((total - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn analytic_jacobian_matches_finite_differences() {
        let data = TradeData::default();
        let b = TradeBenchmark::new(&data);
        let mut costs = data.transport_cost.clone();
        costs[1][0] *= 2.0;
        let problem = TradeMcp::new(&data, &b, costs);
        let x: Vec<f64> = problem
            .start()
            .iter()
            .enumerate()
            .map(|(i, v)| v * (1.0 + 0.01 * i as f64))
            .collect();

        let n = problem.dimension();
        let mut analytic = vec![0.0; n * n];
        problem.jacobian(&x, &mut analytic);
        let numeric = finite_difference_jacobian(&problem, &x, 1e-7);
        for (k, (a, f)) in analytic.iter().zip(&numeric).enumerate() {
            assert!((a - f).abs() < 1e-4, "entry {k}: analytic {a}, numeric {f}");
        }
    }

    #[test]
    fn unknown_route_is_rejected() {
        let scenario = TradeScenario {
            name: "bad".to_string(),
            shocks: vec![CostShock {
                from: "C".to_string(),
                to: "A".to_string(),
                factor: 2.0,
            }],
            replicate_only: false,
        };
        assert!(matches!(
            solve_trade(&TradeData::default(), &scenario, &McpOptions::default()),
            Err(EquilibriumError::InvalidScenario(_))
        ));
    }

    #[test]
    fn negative_or_nan_cost_factor_is_rejected() {
        for factor in [-1.0, f64::NAN, f64::INFINITY] {
            let scenario = TradeScenario {
                name: "bad factor".to_string(),
                shocks: vec![CostShock {
                    from: "B".to_string(),
                    to: "A".to_string(),
                    factor,
                }],
                replicate_only: false,
            };
            assert!(matches!(
                solve_trade(&TradeData::default(), &scenario, &McpOptions::default()),
                Err(EquilibriumError::InvalidScenario(_))
            ));
        }
    }

    #[test]
    fn variable_names_follow_layout() {
        let data = TradeData::default();
        let b = TradeBenchmark::new(&data);
        let problem = TradeMcp::new(&data, &b, data.transport_cost.clone());
        assert_eq!(problem.variable_name(2), "YM[B,A]");
        assert_eq!(problem.variable_name(5), "PM[A,B]");
        assert_eq!(problem.variable_name(8), "YA[A]");
        assert_eq!(problem.variable_name(11), "PA[B]");
    }
}
