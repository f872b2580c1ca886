//! Synthetic plant data drawn around the raw technology tables.

use cge_core::{
    CgeError, CgeResult, FactorTable, Plant, PlantId, SteelData, Technology, TechnologyData,
    DEFAULT_EPSILON,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_PLANT_COUNT: usize = 15;

/// Parameters of the synthetic plant draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub seed: u64,
    /// Number of plants, split evenly across technologies
    pub plant_count: usize,
    pub epsilon: f64,
    pub chi: f64,
    /// Upper bound of the plant-specific factor cost add-on
    pub tau_max: f64,
    pub ylim_min: f64,
    pub ylim_max: f64,
    /// Largest gap between capacity and reference output
    pub slack_max: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            plant_count: DEFAULT_PLANT_COUNT,
            epsilon: DEFAULT_EPSILON,
            chi: 0.0,
            tau_max: 0.1,
            ylim_min: 10.0,
            ylim_max: 15.0,
            slack_max: 5.0,
        }
    }
}

impl GeneratorConfig {
    fn validate(&self) -> CgeResult<()> {
        let techs = Technology::ALL.len();
        if self.plant_count == 0 || self.plant_count % techs != 0 {
            return Err(CgeError::Config(format!(
                "plant count must be a positive multiple of {techs}, got {}",
                self.plant_count
            )));
        }
        if self.plant_count > u16::MAX as usize {
            return Err(CgeError::Config(format!(
                "plant count {} is too large",
                self.plant_count
            )));
        }
        if !(self.tau_max >= 0.0 && self.slack_max >= 0.0) {
            return Err(CgeError::Config(
                "tau_max and slack_max must be non-negative".into(),
            ));
        }
        if !(self.ylim_min > self.slack_max && self.ylim_max >= self.ylim_min) {
            return Err(CgeError::Config(format!(
                "capacity range [{}, {}] must exceed the output slack {}",
                self.ylim_min, self.ylim_max, self.slack_max
            )));
        }
        Ok(())
    }
}

/// Draw plant data and assemble a validated [`SteelData`].
///
/// Draw order is fixed (all `tau`, then capacities, then output gaps) so a
/// given seed always yields the same dataset.
pub fn generate(tech: &TechnologyData, config: &GeneratorConfig) -> CgeResult<SteelData> {
    config.validate()?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let n = config.plant_count;

    let taus: Vec<FactorTable<f64>> = (0..n)
        .map(|_| FactorTable::from_fn(|_| uniform(&mut rng, 0.0, config.tau_max)))
        .collect();
    let ylims: Vec<f64> = (0..n)
        .map(|_| uniform(&mut rng, config.ylim_min, config.ylim_max))
        .collect();
    let gaps: Vec<f64> = (0..n)
        .map(|_| uniform(&mut rng, 0.0, config.slack_max))
        .collect();

    let plants: Vec<Plant> = (0..n)
        .map(|i| Plant {
            id: PlantId::new(i as u16 + 1),
            technology: Technology::for_plant(i, n),
            ylim: ylims[i],
            ybar: ylims[i] - gaps[i],
            tau: taus[i],
        })
        .collect();
    let dbar = plants.iter().map(|p| p.ybar).sum();

    let data = SteelData {
        abar: tech.abar,
        factors: tech.factors,
        plants,
        dbar,
        epsilon: config.epsilon,
        chi: config.chi,
    };
    data.validate()?;
    Ok(data)
}

fn uniform(rng: &mut StdRng, low: f64, high: f64) -> f64 {
    if high > low {
        rng.gen_range(low..high)
    } else {
        low
    }
}
