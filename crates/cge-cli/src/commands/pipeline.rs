use anyhow::Result;
use cge_cli::cli::{CalibrateArgs, GenerateArgs, PipelineArgs, ReportArgs, RunArgs, TradeArgs};
use cge_cli::config::CgeConfig;
use tracing::info;

use super::{calibrate, generate, report, run, trade};

/// Generate, calibrate, sweep and report, then the trade model.
pub fn handle(config: &CgeConfig, args: &PipelineArgs) -> Result<()> {
    info!("stage 1/5: generate");
    let dataset = generate::handle(
        config,
        &GenerateArgs {
            raw: args.raw.clone(),
            seed: args.seed,
            ..GenerateArgs::default()
        },
    )?;

    info!("stage 2/5: calibrate");
    let calibration = calibrate::handle(
        config,
        &CalibrateArgs {
            dataset: Some(dataset.clone()),
            ..CalibrateArgs::default()
        },
    )?;

    info!("stage 3/5: run");
    let sweep = run::handle(
        config,
        &RunArgs {
            dataset: Some(dataset.clone()),
            calibration: Some(calibration),
            scenarios: args.scenarios.clone(),
            ..RunArgs::default()
        },
    )?;

    info!("stage 4/5: report");
    report::handle(
        config,
        &ReportArgs {
            dataset: Some(dataset),
            sweep: Some(sweep),
            ..ReportArgs::default()
        },
    )?;

    if args.skip_trade {
        info!("stage 5/5: trade skipped");
    } else {
        info!("stage 5/5: trade");
        trade::handle(
            config,
            &TradeArgs {
                scenarios: args.scenarios.clone(),
                ..TradeArgs::default()
            },
        )?;
    }
    println!("Pipeline complete; outputs in {}", config.data.output_dir.display());
    Ok(())
}
