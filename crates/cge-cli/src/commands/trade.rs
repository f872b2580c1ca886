use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use cge_algo::{default_trade_scenarios, solve_trade, TradeData, TradeRow};
use cge_cli::cli::TradeArgs;
use cge_cli::common::print_rows;
use cge_cli::config::CgeConfig;
use cge_cli::manifest::record_manifest;
use cge_core::CgeError;
use cge_io::results::write_csv_rows;
use cge_scenarios::{load_spec_from_path, resolve_trade_scenarios};
use tracing::warn;

pub fn handle(config: &CgeConfig, args: &TradeArgs) -> Result<PathBuf> {
    let out = args.out.clone().unwrap_or_else(|| config.data.trade_file());
    let scenarios = match args.scenarios.as_deref() {
        Some(path) => resolve_trade_scenarios(&load_spec_from_path(path)?)?,
        None => default_trade_scenarios(),
    };

    let data = TradeData::default();
    let options = config.solver.mcp_options();
    let mut rows: Vec<TradeRow> = Vec::new();
    let mut skipped = 0usize;
    for scenario in &scenarios {
        match solve_trade(&data, scenario, &options) {
            Ok(result) => rows.extend(result.rows),
            Err(err) => {
                let err = CgeError::from(err);
                if err.is_fatal() {
                    return Err(err.into());
                }
                warn!(scenario = %scenario.name, error = %err, "trade scenario skipped");
                skipped += 1;
            }
        }
    }
    write_csv_rows(&out, &rows)?;

    print_rows(&rows, args.format, |w| {
        writeln!(w, "SCENARIO\tVARIABLE\tFROM\tTO\tVALUE")?;
        for row in &rows {
            writeln!(
                w,
                "{}\t{}\t{}\t{}\t{:.4}",
                row.scenario, row.variable, row.region_from, row.region_to, row.value
            )?;
        }
        Ok(())
    })?;

    record_manifest(
        &config.data.runs_dir(),
        "trade",
        &[],
        &[out.as_path()],
        &[
            ("scenarios", scenarios.len().to_string()),
            ("skipped", skipped.to_string()),
        ],
    )?;
    Ok(out)
}
