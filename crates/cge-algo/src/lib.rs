//! # cge-algo: calibration and equilibrium for the steel model
//!
//! - [`calibration`] - dispatch LP and merit-order shadow prices
//! - [`mcp`] - complementarity problems and the semismooth Newton solver
//! - [`equilibrium`] - the steel market MCP and single-scenario solves
//! - [`sweep`] - benchmark replication and the warm-started scenario sweep
//! - [`report`] - summary, plant and factor rows
//! - [`trade`] - multi-region trade model

pub mod calibration;
pub mod equilibrium;
pub mod error;
pub mod mcp;
pub mod report;
pub mod sweep;
pub mod trade;

pub use calibration::{calibrate, Calibration};
pub use equilibrium::{
    replicate_benchmark, solve_scenario, EquilibriumPoint, ScenarioResult, SteelMcp,
};
pub use error::{CalibrationError, EquilibriumError};
pub use mcp::{McpOptions, McpSolution, McpSolver};
pub use report::{build_report, FactorRow, PlantRow, Report, SummaryRow};
pub use sweep::{run_sweep, ScenarioOutcome, ScenarioState, SweepOptions, SweepReport};
pub use trade::{default_trade_scenarios, solve_trade, TradeData, TradeResult, TradeRow, TradeScenario};
