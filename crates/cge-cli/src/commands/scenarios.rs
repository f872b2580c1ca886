use std::io::Write;
use std::path::Path;

use anyhow::Result;
use cge_cli::cli::{OutputFormat, ScenariosCommands};
use cge_cli::common::print_rows;
use cge_core::Policy;
use cge_scenarios::{default_set, load_spec_from_path, resolve_scenarios, validate};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ScenarioRow {
    scenario: String,
    policy: &'static str,
    cap_fraction: Option<f64>,
    carbon_tax: Option<f64>,
    description: String,
}

pub fn handle(command: &ScenariosCommands) -> Result<()> {
    match command {
        ScenariosCommands::Validate { spec } => handle_validate(spec),
        ScenariosCommands::List { spec, format } => handle_list(spec.as_deref(), *format),
    }
}

fn handle_validate(spec: &Path) -> Result<()> {
    let set = load_spec_from_path(spec)?;
    validate(&set)?;
    println!("Scenario spec validated successfully");
    Ok(())
}

fn handle_list(spec: Option<&Path>, format: OutputFormat) -> Result<()> {
    let set = match spec {
        Some(path) => load_spec_from_path(path)?,
        None => default_set(),
    };
    let rows: Vec<ScenarioRow> = resolve_scenarios(&set)?
        .into_iter()
        .map(|resolved| {
            let (policy, cap_fraction, carbon_tax) = match resolved.config.policy {
                Policy::Benchmark => ("benchmark", None, None),
                Policy::EmissionsCap { fraction } => ("emissions_cap", Some(fraction), None),
                Policy::CarbonTax { price } => ("carbon_tax", None, Some(price)),
            };
            ScenarioRow {
                scenario: resolved.config.name,
                policy,
                cap_fraction,
                carbon_tax,
                description: resolved.description.unwrap_or_default(),
            }
        })
        .collect();
    print_rows(&rows, format, |w| {
        writeln!(w, "SCENARIO\tPOLICY\tCAP FRACTION\tCARBON TAX\tDESCRIPTION")?;
        for row in &rows {
            let show = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_else(|| "-".into());
            writeln!(
                w,
                "{}\t{}\t{}\t{}\t{}",
                row.scenario,
                row.policy,
                show(row.cap_fraction),
                show(row.carbon_tax),
                row.description
            )?;
        }
        Ok(())
    })
}
