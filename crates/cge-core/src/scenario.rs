//! Policy scenarios applied to the calibrated model.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CgeError, CgeResult};

/// Climate policy in force for one equilibrium solve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Policy {
    /// No policy; the carbon price is pinned at zero.
    Benchmark,
    /// Emissions capped at `fraction` of benchmark emissions; the carbon price
    /// is endogenous.
    EmissionsCap { fraction: f64 },
    /// Exogenous carbon price per tonne.
    CarbonTax { price: f64 },
}

impl Policy {
    pub fn validate(&self) -> CgeResult<()> {
        match *self {
            Policy::Benchmark => Ok(()),
            Policy::EmissionsCap { fraction } => {
                if fraction.is_finite() && fraction > 0.0 {
                    Ok(())
                } else {
                    Err(CgeError::Validation(format!(
                        "emissions cap fraction must be positive, got {fraction}"
                    )))
                }
            }
            Policy::CarbonTax { price } => {
                if price.is_finite() && price >= 0.0 {
                    Ok(())
                } else {
                    Err(CgeError::Validation(format!(
                        "carbon tax must be non-negative, got {price}"
                    )))
                }
            }
        }
    }

    /// Carbon price fixed by the policy, if any.
    pub fn pinned_carbon_price(&self) -> Option<f64> {
        match *self {
            Policy::Benchmark => Some(0.0),
            Policy::CarbonTax { price } => Some(price),
            Policy::EmissionsCap { .. } => None,
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::Benchmark => f.write_str("benchmark"),
            Policy::EmissionsCap { fraction } => write!(f, "emissions cap at {fraction}"),
            Policy::CarbonTax { price } => write!(f, "carbon tax {price}"),
        }
    }
}

/// A named, immutable policy configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub name: String,
    pub policy: Policy,
}

impl ScenarioConfig {
    pub fn new(name: impl Into<String>, policy: Policy) -> Self {
        Self {
            name: name.into(),
            policy,
        }
    }

    pub fn benchmark() -> Self {
        Self::new("Reference", Policy::Benchmark)
    }
}

/// Reference, a 20% emissions cut and a $10/tCO2 tax.
pub fn default_sweep() -> Vec<ScenarioConfig> {
    vec![
        ScenarioConfig::benchmark(),
        ScenarioConfig::new("Cap (-20%)", Policy::EmissionsCap { fraction: 0.8 }),
        ScenarioConfig::new("Tax ($10/tCO2)", Policy::CarbonTax { price: 10.0 }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_sweep_starts_with_benchmark() {
        let sweep = default_sweep();
        assert_eq!(sweep.len(), 3);
        assert_eq!(sweep[0].policy, Policy::Benchmark);
        assert_eq!(sweep[1].policy.pinned_carbon_price(), None);
        assert_eq!(sweep[2].policy.pinned_carbon_price(), Some(10.0));
    }

    #[test]
    fn policy_serializes_with_kind_tag() {
        let json = serde_json::to_string(&Policy::EmissionsCap { fraction: 0.8 }).unwrap();
        assert_eq!(json, r#"{"kind":"emissions_cap","fraction":0.8}"#);
        let back: Policy = serde_json::from_str(r#"{"kind":"benchmark"}"#).unwrap();
        assert_eq!(back, Policy::Benchmark);
    }

    #[test]
    fn rejects_out_of_range_policies() {
        assert!(Policy::EmissionsCap { fraction: 0.0 }.validate().is_err());
        assert!(Policy::CarbonTax { price: -1.0 }.validate().is_err());
        assert!(Policy::CarbonTax { price: f64::NAN }.validate().is_err());
    }
}
