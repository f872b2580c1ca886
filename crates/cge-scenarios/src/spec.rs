use anyhow::{anyhow, bail, Context, Result};
use cge_algo::trade::{CostShock, TradeScenario};
use cge_core::{Policy, ScenarioConfig};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioSet {
    pub version: Option<u32>,
    pub description: Option<String>,
    /// Dataset the scenarios were written for
    pub dataset: Option<String>,
    #[serde(default)]
    pub defaults: ScenarioDefaults,
    #[serde(default)]
    pub scenarios: Vec<ScenarioSpec>,
    #[serde(default)]
    pub trade: Vec<TradeScenarioSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioDefaults {
    /// Prepend the reference scenario when the set does not start with one
    #[serde(default = "default_true")]
    pub include_benchmark: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

fn default_true() -> bool {
    true
}

impl Default for ScenarioDefaults {
    fn default() -> Self {
        Self {
            include_benchmark: default_true(),
            tags: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    Benchmark,
    EmissionsCap,
    CarbonTax,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub scenario_id: String,
    pub description: Option<String>,
    pub policy: PolicyKind,
    /// Emissions as a fraction of benchmark emissions (`emissions_cap`)
    pub cap_fraction: Option<f64>,
    /// Carbon price per tonne (`carbon_tax`)
    pub carbon_tax: Option<f64>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub metadata: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeScenarioSpec {
    pub scenario_id: String,
    #[serde(default)]
    pub replicate_only: bool,
    #[serde(default)]
    pub transport_cost_multipliers: Vec<RouteMultiplier>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteMultiplier {
    pub from: String,
    pub to: String,
    pub factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedScenario {
    pub config: ScenarioConfig,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub metadata: BTreeMap<String, String>,
}

pub fn load_spec_from_path(path: &Path) -> Result<ScenarioSet> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading scenario spec '{}'", path.display()))?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
            serde_yaml::from_str(&data).context("parsing scenario spec yaml")
        }
        Some(ext) if ext.eq_ignore_ascii_case("json") => {
            serde_json::from_str(&data).context("parsing scenario spec json")
        }
        _ => serde_yaml::from_str(&data)
            .or_else(|_| serde_json::from_str(&data))
            .context("parsing scenario spec"),
    }
}

fn resolve_policy(spec: &ScenarioSpec) -> Result<Policy> {
    let id = &spec.scenario_id;
    let policy = match spec.policy {
        PolicyKind::Benchmark => {
            if spec.cap_fraction.is_some() || spec.carbon_tax.is_some() {
                bail!("benchmark scenario '{id}' cannot set cap_fraction or carbon_tax");
            }
            Policy::Benchmark
        }
        PolicyKind::EmissionsCap => {
            if spec.carbon_tax.is_some() {
                bail!("emissions cap scenario '{id}' cannot set carbon_tax");
            }
            let fraction = spec
                .cap_fraction
                .ok_or_else(|| anyhow!("emissions cap scenario '{id}' needs cap_fraction"))?;
            Policy::EmissionsCap { fraction }
        }
        PolicyKind::CarbonTax => {
            if spec.cap_fraction.is_some() {
                bail!("carbon tax scenario '{id}' cannot set cap_fraction");
            }
            let price = spec
                .carbon_tax
                .ok_or_else(|| anyhow!("carbon tax scenario '{id}' needs carbon_tax"))?;
            Policy::CarbonTax { price }
        }
    };
    policy
        .validate()
        .with_context(|| format!("scenario '{id}'"))?;
    Ok(policy)
}

pub fn resolve_scenarios(set: &ScenarioSet) -> Result<Vec<ResolvedScenario>> {
    if set.scenarios.is_empty() {
        return Err(anyhow!("scenario set contains no scenarios"));
    }
    let defaults = &set.defaults;
    let mut seen = HashSet::new();
    let mut resolved = Vec::with_capacity(set.scenarios.len() + 1);

    let starts_with_benchmark = set.scenarios[0].policy == PolicyKind::Benchmark;
    if defaults.include_benchmark && !starts_with_benchmark {
        let benchmark = ScenarioConfig::benchmark();
        seen.insert(benchmark.name.clone());
        resolved.push(ResolvedScenario {
            config: benchmark,
            description: Some("No climate policy".to_string()),
            tags: defaults.tags.clone(),
            metadata: defaults.metadata.clone(),
        });
    }

    for scenario in &set.scenarios {
        if scenario.scenario_id.trim().is_empty() {
            return Err(anyhow!("scenario_id cannot be empty"));
        }
        if !seen.insert(scenario.scenario_id.clone()) {
            return Err(anyhow!(
                "duplicate scenario_id '{}' in spec",
                scenario.scenario_id
            ));
        }
        let policy = resolve_policy(scenario)?;
        resolved.push(ResolvedScenario {
            config: ScenarioConfig::new(scenario.scenario_id.clone(), policy),
            description: scenario.description.clone(),
            tags: scenario
                .tags
                .clone()
                .unwrap_or_else(|| defaults.tags.clone()),
            metadata: scenario
                .metadata
                .clone()
                .unwrap_or_else(|| defaults.metadata.clone()),
        });
    }
    Ok(resolved)
}

/// Trade scenarios of the set; the built-in pair when none are declared.
pub fn resolve_trade_scenarios(set: &ScenarioSet) -> Result<Vec<TradeScenario>> {
    if set.trade.is_empty() {
        return Ok(cge_algo::default_trade_scenarios());
    }
    let mut seen = HashSet::new();
    set.trade
        .iter()
        .map(|spec| {
            if spec.scenario_id.trim().is_empty() {
                bail!("trade scenario_id cannot be empty");
            }
            if !seen.insert(spec.scenario_id.clone()) {
                bail!("duplicate trade scenario_id '{}' in spec", spec.scenario_id);
            }
            for m in &spec.transport_cost_multipliers {
                if !(m.factor.is_finite() && m.factor >= 0.0) {
                    bail!(
                        "trade scenario '{}': multiplier for {} -> {} must be non-negative",
                        spec.scenario_id,
                        m.from,
                        m.to
                    );
                }
            }
            Ok(TradeScenario {
                name: spec.scenario_id.clone(),
                shocks: spec
                    .transport_cost_multipliers
                    .iter()
                    .map(|m| CostShock {
                        from: m.from.clone(),
                        to: m.to.clone(),
                        factor: m.factor,
                    })
                    .collect(),
                replicate_only: spec.replicate_only,
            })
        })
        .collect()
}

pub fn validate(set: &ScenarioSet) -> Result<()> {
    resolve_scenarios(set)?;
    resolve_trade_scenarios(set)?;
    Ok(())
}

/// The reference, cap and tax scenarios as a spec document.
pub fn default_set() -> ScenarioSet {
    let scenarios = cge_core::default_sweep()
        .into_iter()
        .map(|config| {
            let (policy, cap_fraction, carbon_tax) = match config.policy {
                Policy::Benchmark => (PolicyKind::Benchmark, None, None),
                Policy::EmissionsCap { fraction } => (PolicyKind::EmissionsCap, Some(fraction), None),
                Policy::CarbonTax { price } => (PolicyKind::CarbonTax, None, Some(price)),
            };
            ScenarioSpec {
                scenario_id: config.name,
                description: None,
                policy,
                cap_fraction,
                carbon_tax,
                tags: None,
                metadata: None,
            }
        })
        .collect();
    ScenarioSet {
        version: Some(1),
        description: Some("Reference, emissions cap and carbon tax".to_string()),
        dataset: None,
        defaults: ScenarioDefaults::default(),
        scenarios,
        trade: Vec::new(),
    }
}
