use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cge_algo::{calibrate, Calibration};
use cge_cli::cli::{CalibrateArgs, OutputFormat};
use cge_cli::common::print_rows;
use cge_cli::config::CgeConfig;
use cge_cli::manifest::record_manifest;
use cge_core::SteelData;
use cge_io::load_dataset;
use cge_io::results::{read_json, write_json};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Serialize)]
struct CalibrationRow {
    plant: String,
    technology: String,
    capacity: f64,
    output: f64,
    unit_cost: f64,
    rent: f64,
}

pub fn handle(config: &CgeConfig, args: &CalibrateArgs) -> Result<PathBuf> {
    let dataset = args
        .dataset
        .clone()
        .unwrap_or_else(|| config.data.dataset.clone());
    let out = args
        .out
        .clone()
        .unwrap_or_else(|| config.data.calibration_file());

    let data = load_dataset(&dataset)
        .with_context(|| format!("loading dataset {}", dataset.display()))?;
    let calibration = calibrate(&data)?;
    write_json(&out, &calibration)?;
    print_calibration(&data, &calibration, args.format)?;

    record_manifest(
        &config.data.runs_dir(),
        "calibrate",
        &[dataset.as_path()],
        &[out.as_path()],
        &[("steel_price", format!("{:.6}", calibration.pbar))],
    )?;
    Ok(out)
}

/// Read `path` when it holds a calibration of `data`, otherwise calibrate
/// `data` and store the result at `path`.
pub fn load_or_calibrate(data: &SteelData, path: &Path) -> Result<Calibration> {
    if path.exists() {
        let stored: Calibration = read_json(path)?;
        if stored.is_consistent_with(data) {
            info!(calibration = %path.display(), "using stored calibration");
            return Ok(stored);
        }
        warn!(
            calibration = %path.display(),
            "stored calibration does not match the dataset, recalibrating"
        );
    }
    let calibration = calibrate(data)?;
    write_json(path, &calibration)?;
    Ok(calibration)
}

fn print_calibration(
    data: &SteelData,
    calibration: &Calibration,
    format: OutputFormat,
) -> Result<()> {
    let rows: Vec<CalibrationRow> = data
        .plants
        .iter()
        .enumerate()
        .map(|(i, plant)| CalibrationRow {
            plant: plant.id.to_string(),
            technology: plant.technology.code().to_string(),
            capacity: plant.ylim,
            output: calibration.ybar[i],
            unit_cost: calibration.unit_cost[i],
            rent: calibration.rbar[i],
        })
        .collect();

    if format == OutputFormat::Table {
        let marginal = calibration
            .marginal_plant
            .map(|id| id.to_string())
            .unwrap_or_else(|| "none".to_string());
        println!(
            "Steel price {:.4} (marginal plant {}), output {:.3}, emissions {:.3}",
            calibration.pbar,
            marginal,
            calibration.total_output(),
            calibration.benchmark_emissions()
        );
    }
    print_rows(&rows, format, |w| {
        writeln!(w, "PLANT\tTECH\tCAPACITY\tOUTPUT\tUNIT COST\tRENT")?;
        for row in &rows {
            writeln!(
                w,
                "{}\t{}\t{:.3}\t{:.3}\t{:.4}\t{:.4}",
                row.plant, row.technology, row.capacity, row.output, row.unit_cost, row.rent
            )?;
        }
        Ok(())
    })
}
