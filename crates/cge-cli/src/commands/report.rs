use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use cge_algo::{build_report, Report, SweepReport};
use cge_cli::cli::ReportArgs;
use cge_cli::common::print_rows;
use cge_cli::config::CgeConfig;
use cge_cli::manifest::record_manifest;
use cge_io::load_dataset;
use cge_io::results::{read_json, write_csv_rows, write_json};
use tracing::info;

pub const SUMMARY_FILE: &str = "summary.csv";
pub const PLANTS_FILE: &str = "plants.csv";
pub const FACTORS_FILE: &str = "factors.csv";
pub const REPORT_FILE: &str = "report.json";

pub fn handle(config: &CgeConfig, args: &ReportArgs) -> Result<Vec<PathBuf>> {
    let dataset = args
        .dataset
        .clone()
        .unwrap_or_else(|| config.data.dataset.clone());
    let sweep_path = args.sweep.clone().unwrap_or_else(|| config.data.sweep_file());
    let out_dir = args
        .out_dir
        .clone()
        .unwrap_or_else(|| config.data.output_dir.clone());

    let data = load_dataset(&dataset)
        .with_context(|| format!("loading dataset {}", dataset.display()))?;
    let mut sweep: SweepReport = read_json(&sweep_path)
        .with_context(|| format!("loading sweep {}", sweep_path.display()))?;
    let report = build_report(&data, &mut sweep);

    let outputs = write_report(&report, &out_dir)?;
    // keep the stored sweep in step with the reported states
    write_json(&sweep_path, &sweep)?;

    print_rows(&report.summary, args.format, |w| {
        writeln!(
            w,
            "SCENARIO\tPRODUCTION\tEMISSIONS\tSTEEL PRICE\tCARBON PRICE\tINTENSITY\tPROD %\tEMIS %\tBOF\tEAF\tDRI"
        )?;
        for row in &report.summary {
            writeln!(
                w,
                "{}\t{:.3}\t{:.3}\t{:.4}\t{:.4}\t{:.4}\t{:.2}\t{:.2}\t{:.3}\t{:.3}\t{:.3}",
                row.scenario,
                row.production,
                row.emissions,
                row.steel_price,
                row.carbon_price,
                row.emissions_intensity,
                row.production_change_pct,
                row.emissions_change_pct,
                row.bof_share,
                row.eaf_share,
                row.dri_share
            )?;
        }
        Ok(())
    })?;
    for failed in &report.failed {
        println!("Skipped {}: {}", failed.scenario, failed.reason);
    }

    let output_refs: Vec<_> = outputs.iter().map(PathBuf::as_path).collect();
    record_manifest(
        &config.data.runs_dir(),
        "report",
        &[dataset.as_path(), sweep_path.as_path()],
        &output_refs,
        &[("scenarios", report.summary.len().to_string())],
    )?;
    Ok(outputs)
}

/// Write the CSV tables and the JSON document into `out_dir`.
pub fn write_report(report: &Report, out_dir: &std::path::Path) -> Result<Vec<PathBuf>> {
    let summary = out_dir.join(SUMMARY_FILE);
    let plants = out_dir.join(PLANTS_FILE);
    let factors = out_dir.join(FACTORS_FILE);
    let json = out_dir.join(REPORT_FILE);
    write_csv_rows(&summary, &report.summary)?;
    write_csv_rows(&plants, &report.plants)?;
    write_csv_rows(&factors, &report.factors)?;
    write_json(&json, report)?;
    info!(dir = %out_dir.display(), "report written");
    Ok(vec![summary, plants, factors, json])
}
