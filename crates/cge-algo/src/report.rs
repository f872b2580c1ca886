//! Flat, plot-ready rows built from a sweep.

use cge_core::{Factor, SteelData, Technology};
use serde::{Deserialize, Serialize};

use crate::equilibrium::ScenarioResult;
use crate::sweep::{ScenarioState, SweepReport};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    #[serde(rename = "Scenario")]
    pub scenario: String,
    #[serde(rename = "Production")]
    pub production: f64,
    #[serde(rename = "Emissions")]
    pub emissions: f64,
    #[serde(rename = "Steel Price")]
    pub steel_price: f64,
    #[serde(rename = "Carbon Price")]
    pub carbon_price: f64,
    #[serde(rename = "Emissions Intensity")]
    pub emissions_intensity: f64,
    #[serde(rename = "Production Change %")]
    pub production_change_pct: f64,
    #[serde(rename = "Emissions Change %")]
    pub emissions_change_pct: f64,
    #[serde(rename = "BOF Share")]
    pub bof_share: f64,
    #[serde(rename = "EAF Share")]
    pub eaf_share: f64,
    #[serde(rename = "DRI Share")]
    pub dri_share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantRow {
    #[serde(rename = "Scenario")]
    pub scenario: String,
    #[serde(rename = "Plant")]
    pub plant: String,
    #[serde(rename = "Technology")]
    pub technology: String,
    #[serde(rename = "Output")]
    pub output: f64,
    #[serde(rename = "Rent")]
    pub rent: f64,
    #[serde(rename = "Capacity Utilisation")]
    pub utilisation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorRow {
    #[serde(rename = "Scenario")]
    pub scenario: String,
    #[serde(rename = "Factor")]
    pub factor: String,
    #[serde(rename = "Price")]
    pub price: f64,
    #[serde(rename = "Demand")]
    pub demand: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedScenario {
    pub scenario: String,
    pub reason: String,
}

/// All result tables of a sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub summary: Vec<SummaryRow>,
    pub plants: Vec<PlantRow>,
    pub factors: Vec<FactorRow>,
    pub failed: Vec<FailedScenario>,
}

/// Build rows for every solved scenario and mark those scenarios reported.
///
/// Scenarios already reported are included again, so a sweep can be reported
/// any number of times. Change percentages are relative to the first solved
/// scenario.
pub fn build_report(data: &SteelData, sweep: &mut SweepReport) -> Report {
    let mut report = Report::default();
    let mut base: Option<(f64, f64)> = None;

    for outcome in &mut sweep.outcomes {
        if let ScenarioState::Failed(reason) = &outcome.state {
            report.failed.push(FailedScenario {
                scenario: outcome.config.name.clone(),
                reason: reason.clone(),
            });
            continue;
        }
        if !matches!(outcome.state, ScenarioState::Solved | ScenarioState::Reported) {
            continue;
        }
        if let Some(result) = outcome.result.as_ref() {
            let (base_production, base_emissions) =
                *base.get_or_insert((result.production, result.emissions));
            report
                .summary
                .push(summary_row(data, result, base_production, base_emissions));
            report.plants.extend(plant_rows(data, result));
            report.factors.extend(factor_rows(result));
            outcome.state = ScenarioState::Reported;
        }
    }
    report
}

fn percent_change(value: f64, base: f64) -> f64 {
    if base.abs() > f64::EPSILON {
        100.0 * (value / base - 1.0)
    } else {
        0.0
    }
}

fn share(part: f64, total: f64) -> f64 {
    if total.abs() > f64::EPSILON {
        part / total
    } else {
        0.0
    }
}

fn summary_row(
    data: &SteelData,
    result: &ScenarioResult,
    base_production: f64,
    base_emissions: f64,
) -> SummaryRow {
    let mut by_tech = [0.0; 3];
    for (plant, y) in data.plants.iter().zip(&result.point.output) {
        by_tech[plant.technology.index()] += y;
    }
    let production = result.production;

    SummaryRow {
        scenario: result.scenario.name.clone(),
        production,
        emissions: result.emissions,
        steel_price: result.point.steel_price,
        carbon_price: result.point.carbon_price,
        emissions_intensity: share(result.emissions, production),
        production_change_pct: percent_change(production, base_production),
        emissions_change_pct: percent_change(result.emissions, base_emissions),
        bof_share: share(by_tech[Technology::Bof.index()], production),
        eaf_share: share(by_tech[Technology::Eaf.index()], production),
        dri_share: share(by_tech[Technology::Dri.index()], production),
    }
}

fn plant_rows<'a>(
    data: &'a SteelData,
    result: &'a ScenarioResult,
) -> impl Iterator<Item = PlantRow> + 'a {
    data.plants.iter().enumerate().map(move |(i, plant)| PlantRow {
        scenario: result.scenario.name.clone(),
        plant: plant.id.to_string(),
        technology: plant.technology.label().to_string(),
        output: result.point.output[i],
        rent: result.point.rents[i],
        utilisation: share(result.point.output[i], plant.ylim),
    })
}

fn factor_rows(result: &ScenarioResult) -> impl Iterator<Item = FactorRow> + '_ {
    Factor::ALL.into_iter().map(move |f| FactorRow {
        scenario: result.scenario.name.clone(),
        factor: f.code().to_string(),
        price: result.point.factor_prices[f],
        demand: result.factor_demand[f],
    })
}
