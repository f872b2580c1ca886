//! Parameters of the steel model and their load-time validation.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{CgeError, CgeResult};
use crate::sets::{Factor, FactorTable, PlantId, TechTable, Technology};

/// Default steel demand elasticity.
pub const DEFAULT_EPSILON: f64 = -0.3;

/// A production site with its technology and plant-specific data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plant {
    pub id: PlantId,
    pub technology: Technology,
    /// Capacity limit
    pub ylim: f64,
    /// Reference output
    pub ybar: f64,
    /// Plant-specific add-on to each factor price
    pub tau: FactorTable<f64>,
}

/// Market data for one factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorParams {
    /// Reference price
    pub vbar: f64,
    /// Supply elasticity
    pub rho: f64,
    /// Emissions per unit of factor use
    pub kappa: f64,
}

impl Default for FactorParams {
    fn default() -> Self {
        Self {
            vbar: 1.0,
            rho: 0.0,
            kappa: 0.0,
        }
    }
}

/// Technology and factor tables as read from the raw inputs, before any plant
/// data is synthesized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnologyData {
    /// Factor-use coefficients per unit of output, `abar[t][f]`
    pub abar: TechTable<FactorTable<f64>>,
    pub factors: FactorTable<FactorParams>,
}

/// Complete input of the model: sets, parameters and scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SteelData {
    pub abar: TechTable<FactorTable<f64>>,
    pub factors: FactorTable<FactorParams>,
    pub plants: Vec<Plant>,
    /// Aggregate reference demand
    pub dbar: f64,
    /// Steel demand elasticity
    pub epsilon: f64,
    /// Emissions target fraction
    pub chi: f64,
}

impl SteelData {
    pub fn coefficient(&self, plant: &Plant, factor: Factor) -> f64 {
        self.abar[plant.technology][factor]
    }

    /// Reference unit cost `Σ_f abar (vbar + tau)`.
    pub fn unit_cost(&self, plant: &Plant) -> f64 {
        self.unit_cost_at(plant, &FactorTable::from_fn(|f| self.factors[f].vbar))
    }

    /// Unit factor cost at arbitrary factor prices.
    pub fn unit_cost_at(&self, plant: &Plant, prices: &FactorTable<f64>) -> f64 {
        Factor::ALL
            .iter()
            .map(|&f| self.coefficient(plant, f) * (prices[f] + plant.tau[f]))
            .sum()
    }

    /// Emissions per unit of output `Σ_f kappa abar`.
    pub fn emission_intensity(&self, tech: Technology) -> f64 {
        Factor::ALL
            .iter()
            .map(|&f| self.factors[f].kappa * self.abar[tech][f])
            .sum()
    }

    pub fn total_capacity(&self) -> f64 {
        self.plants.iter().map(|p| p.ylim).sum()
    }

    /// Factor demand `Σ_i abar Y_i` for the given outputs.
    pub fn factor_use(&self, output: &[f64]) -> FactorTable<f64> {
        FactorTable::from_fn(|f| {
            self.plants
                .iter()
                .zip(output)
                .map(|(p, y)| self.coefficient(p, f) * y)
                .sum()
        })
    }

    /// Total emissions `Σ_i (Σ_f abar kappa) Y_i`.
    pub fn emissions(&self, output: &[f64]) -> f64 {
        self.plants
            .iter()
            .zip(output)
            .map(|(p, y)| self.emission_intensity(p.technology) * y)
            .sum()
    }

    pub fn plant(&self, id: PlantId) -> Option<&Plant> {
        self.plants.iter().find(|p| p.id == id)
    }

    /// Checks every load-time invariant. Failures are fatal data errors.
    pub fn validate(&self) -> CgeResult<()> {
        if self.plants.is_empty() {
            return Err(CgeError::Validation("dataset contains no plants".into()));
        }

        for (tech, row) in self.abar.iter() {
            for (factor, value) in row.iter() {
                check_non_negative(*value, || format!("abar[{tech},{factor}]"))?;
            }
        }

        for (factor, params) in self.factors.iter() {
            if !(params.vbar.is_finite() && params.vbar > 0.0) {
                return Err(CgeError::Validation(format!(
                    "vbar[{factor}] must be positive, got {}",
                    params.vbar
                )));
            }
            check_non_negative(params.rho, || format!("rho[{factor}]"))?;
            check_non_negative(params.kappa, || format!("kappa[{factor}]"))?;
        }

        let mut seen = HashSet::new();
        for plant in &self.plants {
            if !seen.insert(plant.id) {
                return Err(CgeError::Validation(format!(
                    "plant {} is listed more than once",
                    plant.id
                )));
            }
            if !(plant.ylim.is_finite() && plant.ylim > 0.0) {
                return Err(CgeError::Validation(format!(
                    "ylim[{}] must be positive, got {}",
                    plant.id, plant.ylim
                )));
            }
            check_non_negative(plant.ybar, || format!("ybar[{}]", plant.id))?;
            for (factor, value) in plant.tau.iter() {
                check_non_negative(*value, || format!("tau[{},{factor}]", plant.id))?;
            }
        }

        if !(self.epsilon.is_finite() && self.epsilon <= 0.0) {
            return Err(CgeError::Validation(format!(
                "epsilon must be non-positive, got {}",
                self.epsilon
            )));
        }
        if !(self.dbar.is_finite() && self.dbar > 0.0) {
            return Err(CgeError::Validation(format!(
                "dbar must be positive, got {}",
                self.dbar
            )));
        }
        check_non_negative(self.chi, || "chi".to_string())?;
        Ok(())
    }
}

fn check_non_negative(value: f64, name: impl FnOnce() -> String) -> CgeResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(CgeError::Validation(format!(
            "{} must be finite and non-negative, got {}",
            name(),
            value
        )))
    }
}
