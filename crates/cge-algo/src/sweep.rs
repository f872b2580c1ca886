//! Sequential policy sweep with warm starts.

use cge_core::{ScenarioConfig, SteelData};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::calibration::Calibration;
use crate::equilibrium::{replicate_benchmark, solve_scenario, EquilibriumPoint, ScenarioResult};
use crate::error::EquilibriumError;
use crate::mcp::McpOptions;

/// Default threshold on the benchmark residual at the calibrated point.
pub const DEFAULT_REPLICATION_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepOptions {
    pub mcp: McpOptions,
    pub replication_tolerance: f64,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            mcp: McpOptions::default(),
            replication_tolerance: DEFAULT_REPLICATION_TOLERANCE,
        }
    }
}

/// Lifecycle of one scenario in a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum ScenarioState {
    Configured,
    Solved,
    Reported,
    /// Terminal; the scenario is left out of the report
    Failed(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub config: ScenarioConfig,
    pub state: ScenarioState,
    pub result: Option<ScenarioResult>,
}

impl ScenarioOutcome {
    fn configured(config: ScenarioConfig) -> Self {
        Self {
            config,
            state: ScenarioState::Configured,
            result: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    /// `||Phi||_inf` of the benchmark at the calibrated point
    pub replication_residual: f64,
    pub outcomes: Vec<ScenarioOutcome>,
}

impl SweepReport {
    pub fn solved(&self) -> impl Iterator<Item = &ScenarioResult> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes.iter().filter_map(|o| match &o.state {
            ScenarioState::Failed(reason) => Some((o.config.name.as_str(), reason.as_str())),
            _ => None,
        })
    }
}

/// Replicate the benchmark, then solve each scenario in order.
///
/// Each solve starts from the last successful solution. A scenario that
/// fails to converge is marked [`ScenarioState::Failed`] and the sweep moves
/// on; only a replication failure aborts.
pub fn run_sweep(
    data: &SteelData,
    calibration: &Calibration,
    scenarios: &[ScenarioConfig],
    options: &SweepOptions,
) -> Result<SweepReport, EquilibriumError> {
    let replication_residual =
        replicate_benchmark(data, calibration, &options.mcp, options.replication_tolerance)?;

    let mut outcomes: Vec<ScenarioOutcome> = scenarios
        .iter()
        .cloned()
        .map(ScenarioOutcome::configured)
        .collect();
    let mut warm_start = EquilibriumPoint::benchmark(data, calibration);

    for outcome in &mut outcomes {
        info!(scenario = %outcome.config.name, policy = %outcome.config.policy, "running scenario");
        match solve_scenario(
            data,
            calibration,
            &outcome.config,
            Some(&warm_start),
            &options.mcp,
        ) {
            Ok(result) => {
                warm_start = result.point.clone();
                outcome.state = ScenarioState::Solved;
                outcome.result = Some(result);
            }
            Err(err) => {
                warn!(scenario = %outcome.config.name, error = %err, "scenario skipped");
                outcome.state = ScenarioState::Failed(err.to_string());
            }
        }
    }

    Ok(SweepReport {
        replication_residual,
        outcomes,
    })
}
