use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cge_algo::{run_sweep, ScenarioState, SweepReport};
use cge_cli::cli::RunArgs;
use cge_cli::config::CgeConfig;
use cge_cli::manifest::record_manifest;
use cge_core::{default_sweep, ScenarioConfig};
use cge_io::load_dataset;
use cge_io::results::write_json;
use cge_scenarios::{load_spec_from_path, resolve_scenarios};
use tabwriter::TabWriter;
use tracing::warn;

use super::calibrate::load_or_calibrate;

pub fn scenario_configs(spec: Option<&Path>) -> Result<Vec<ScenarioConfig>> {
    match spec {
        Some(path) => {
            let set = load_spec_from_path(path)?;
            Ok(resolve_scenarios(&set)?
                .into_iter()
                .map(|resolved| resolved.config)
                .collect())
        }
        None => Ok(default_sweep()),
    }
}

pub fn handle(config: &CgeConfig, args: &RunArgs) -> Result<PathBuf> {
    let dataset = args
        .dataset
        .clone()
        .unwrap_or_else(|| config.data.dataset.clone());
    let calibration_path = args
        .calibration
        .clone()
        .unwrap_or_else(|| config.data.calibration_file());
    let out = args.out.clone().unwrap_or_else(|| config.data.sweep_file());

    let mut options = config.solver.sweep_options();
    if let Some(tolerance) = args.tolerance {
        options.mcp.tolerance = tolerance;
    }
    if let Some(max_iterations) = args.max_iterations {
        options.mcp.max_iterations = max_iterations;
    }

    let scenarios = scenario_configs(args.scenarios.as_deref())?;
    let data = load_dataset(&dataset)
        .with_context(|| format!("loading dataset {}", dataset.display()))?;
    let calibration = load_or_calibrate(&data, &calibration_path)?;

    let sweep = run_sweep(&data, &calibration, &scenarios, &options)?;
    write_json(&out, &sweep)?;
    print_sweep(&sweep)?;

    let failed = sweep.failures().count();
    if failed > 0 {
        warn!(failed, "some scenarios did not converge and were skipped");
    }

    let mut inputs = vec![dataset.as_path()];
    if let Some(spec) = args.scenarios.as_deref() {
        inputs.push(spec);
    }
    record_manifest(
        &config.data.runs_dir(),
        "run",
        &inputs,
        &[out.as_path()],
        &[
            ("scenarios", scenarios.len().to_string()),
            ("failed", failed.to_string()),
            ("tolerance", options.mcp.tolerance.to_string()),
            ("max_iterations", options.mcp.max_iterations.to_string()),
        ],
    )?;
    Ok(out)
}

fn print_sweep(sweep: &SweepReport) -> Result<()> {
    println!(
        "Benchmark replicated (residual {:.3e})",
        sweep.replication_residual
    );
    let mut writer = TabWriter::new(io::stdout());
    writeln!(
        writer,
        "SCENARIO\tSTATE\tITER\tPRODUCTION\tEMISSIONS\tSTEEL PRICE\tCARBON PRICE"
    )?;
    for outcome in &sweep.outcomes {
        match (&outcome.state, &outcome.result) {
            (ScenarioState::Failed(reason), _) => {
                writeln!(writer, "{}\tfailed\t-\t-\t-\t-\t-", outcome.config.name)?;
                warn!(scenario = %outcome.config.name, %reason, "skipped");
            }
            (_, Some(result)) => writeln!(
                writer,
                "{}\tsolved\t{}\t{:.3}\t{:.3}\t{:.4}\t{:.4}",
                outcome.config.name,
                result.iterations,
                result.production,
                result.emissions,
                result.point.steel_price,
                result.point.carbon_price
            )?,
            (_, None) => writeln!(writer, "{}\tconfigured\t-\t-\t-\t-\t-", outcome.config.name)?,
        }
    }
    writer.flush()?;
    Ok(())
}
