use std::path::PathBuf;

use anyhow::{Context, Result};
use cge_cli::cli::GenerateArgs;
use cge_cli::config::CgeConfig;
use cge_cli::manifest::record_manifest;
use cge_io::{generate, read_technology_data, save_dataset};
use tracing::info;

pub fn handle(config: &CgeConfig, args: &GenerateArgs) -> Result<PathBuf> {
    let raw = args.raw.clone().unwrap_or_else(|| config.data.raw_dir.clone());
    let out = args.out.clone().unwrap_or_else(|| config.data.dataset.clone());
    let mut generator = config.generator.clone();
    if let Some(seed) = args.seed {
        generator.seed = seed;
    }
    if let Some(plants) = args.plants {
        generator.plant_count = plants;
    }

    info!(raw = %raw.display(), "reading raw technology tables");
    let tech = read_technology_data(&raw)
        .with_context(|| format!("loading raw tables from {}", raw.display()))?;
    let data = generate(&tech, &generator)?;
    save_dataset(&data, &out, Some(generator.seed))
        .with_context(|| format!("writing dataset {}", out.display()))?;
    println!(
        "Generated {} plants (seed {}, demand {:.3}) -> {}",
        data.plants.len(),
        generator.seed,
        data.dbar,
        out.display()
    );

    record_manifest(
        &config.data.runs_dir(),
        "generate",
        &[raw.as_path()],
        &[out.as_path()],
        &[
            ("seed", generator.seed.to_string()),
            ("plants", generator.plant_count.to_string()),
        ],
    )?;
    Ok(out)
}
