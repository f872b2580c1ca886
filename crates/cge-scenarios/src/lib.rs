//! Scenario specification files (YAML or JSON) and their resolution into
//! immutable [`cge_core::ScenarioConfig`] values.

pub mod spec;

pub use spec::{
    default_set, load_spec_from_path, resolve_scenarios, resolve_trade_scenarios, validate,
    PolicyKind, ResolvedScenario, ScenarioDefaults, ScenarioSet, ScenarioSpec, TradeScenarioSpec,
};
