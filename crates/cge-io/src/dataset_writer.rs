//! Arrow dataset directory writer with atomic commit.
//!
//! Layout: `output/{sets_*,params_*,scalars}.arrow` plus `manifest.json`.
//! Tables are written into a sibling temp directory which is renamed into place
//! once every file and the manifest are complete.

use anyhow::{Context, Result};
use cge_core::{Factor, SteelData, Technology};
use polars::io::ipc::IpcWriter;
use polars::prelude::{DataFrame, NamedFrom, SerWriter, Series};
use std::fs;
use std::path::{Path, PathBuf};

use crate::manifest::{compute_sha256, DatasetManifest, TableInfo, MANIFEST_FILE};

pub struct DatasetWriter {
    temp_dir: PathBuf,
    final_dir: PathBuf,
}

impl DatasetWriter {
    pub fn new(output_path: impl AsRef<Path>) -> Result<Self> {
        let final_dir = output_path.as_ref().to_path_buf();
        let temp_dir = final_dir.with_extension("tmp");

        // Leftover from an interrupted write
        if temp_dir.exists() {
            fs::remove_dir_all(&temp_dir).with_context(|| {
                format!("cleaning up stale temp directory: {}", temp_dir.display())
            })?;
        }
        fs::create_dir_all(&temp_dir)
            .with_context(|| format!("creating temp directory: {}", temp_dir.display()))?;

        Ok(Self {
            temp_dir,
            final_dir,
        })
    }

    /// Write every table and the manifest, then commit.
    pub fn write_dataset(&self, data: &SteelData, seed: Option<u64>) -> Result<DatasetManifest> {
        let mut manifest = DatasetManifest::new(env!("CARGO_PKG_VERSION"), seed);

        self.write_sets(data, &mut manifest)?;
        self.write_params(data, &mut manifest)?;
        self.write_scalars(data, &mut manifest)?;

        // Manifest last: its presence marks a complete dataset
        self.write_manifest(&manifest).context("writing manifest")?;
        self.commit().context("atomic commit")?;
        Ok(manifest)
    }

    fn write_manifest(&self, manifest: &DatasetManifest) -> Result<()> {
        let manifest_path = self.temp_dir.join(MANIFEST_FILE);
        let json =
            serde_json::to_string_pretty(manifest).context("serializing manifest to JSON")?;
        fs::write(&manifest_path, json)
            .with_context(|| format!("writing manifest: {}", manifest_path.display()))?;
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        if self.final_dir.exists() {
            fs::remove_dir_all(&self.final_dir).with_context(|| {
                format!(
                    "removing existing output directory: {}",
                    self.final_dir.display()
                )
            })?;
        }
        if let Some(parent) = self.final_dir.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating parent directory: {}", parent.display()))?;
            }
        }
        fs::rename(&self.temp_dir, &self.final_dir).with_context(|| {
            format!(
                "atomic rename: {} -> {}",
                self.temp_dir.display(),
                self.final_dir.display()
            )
        })?;
        Ok(())
    }

    /// Remove the temp directory after a failed write.
    pub fn cleanup(&self) -> Result<()> {
        if self.temp_dir.exists() {
            fs::remove_dir_all(&self.temp_dir).with_context(|| {
                format!("cleaning up temp directory: {}", self.temp_dir.display())
            })?;
        }
        Ok(())
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    pub fn final_dir(&self) -> &Path {
        &self.final_dir
    }

    fn write_table(
        &self,
        name: &str,
        df: &mut DataFrame,
        manifest: &mut DatasetManifest,
    ) -> Result<()> {
        let path = self.temp_dir.join(format!("{}.arrow", name));
        {
            let mut file = fs::File::create(&path)
                .with_context(|| format!("creating table file {}", path.display()))?;
            IpcWriter::new(&mut file)
                .finish(df)
                .with_context(|| format!("writing table {}", name))?;
        }

        let sha256 = compute_sha256(&path)?;
        manifest.add_table(
            name,
            TableInfo {
                sha256,
                row_count: df.height() as u64,
            },
        );
        Ok(())
    }

    fn write_sets(&self, data: &SteelData, manifest: &mut DatasetManifest) -> Result<()> {
        let techs: Vec<&str> = Technology::ALL.iter().map(|t| t.code()).collect();
        let mut df = DataFrame::new(vec![Series::new("t", techs)])?;
        self.write_table("sets_technologies", &mut df, manifest)?;

        let factors: Vec<&str> = Factor::ALL.iter().map(|f| f.code()).collect();
        let mut df = DataFrame::new(vec![Series::new("f", factors)])?;
        self.write_table("sets_factors", &mut df, manifest)?;

        let ids: Vec<String> = data.plants.iter().map(|p| p.id.to_string()).collect();
        let plant_techs: Vec<&str> = data.plants.iter().map(|p| p.technology.code()).collect();
        let mut df = DataFrame::new(vec![Series::new("i", ids), Series::new("t", plant_techs)])?;
        self.write_table("sets_plants", &mut df, manifest)
    }

    fn write_params(&self, data: &SteelData, manifest: &mut DatasetManifest) -> Result<()> {
        let mut t_col = Vec::new();
        let mut f_col = Vec::new();
        let mut values = Vec::new();
        for (tech, row) in data.abar.iter() {
            for (factor, value) in row.iter() {
                t_col.push(tech.code());
                f_col.push(factor.code());
                values.push(*value);
            }
        }
        let mut df = DataFrame::new(vec![
            Series::new("t", t_col),
            Series::new("f", f_col),
            Series::new("value", values),
        ])?;
        self.write_table("params_abar", &mut df, manifest)?;

        let factors: Vec<&str> = Factor::ALL.iter().map(|f| f.code()).collect();
        let vbar: Vec<f64> = data.factors.0.iter().map(|p| p.vbar).collect();
        let rho: Vec<f64> = data.factors.0.iter().map(|p| p.rho).collect();
        let kappa: Vec<f64> = data.factors.0.iter().map(|p| p.kappa).collect();
        let mut df = DataFrame::new(vec![
            Series::new("f", factors),
            Series::new("vbar", vbar),
            Series::new("rho", rho),
            Series::new("kappa", kappa),
        ])?;
        self.write_table("params_factors", &mut df, manifest)?;

        let ids: Vec<String> = data.plants.iter().map(|p| p.id.to_string()).collect();
        let ylim: Vec<f64> = data.plants.iter().map(|p| p.ylim).collect();
        let ybar: Vec<f64> = data.plants.iter().map(|p| p.ybar).collect();
        let mut df = DataFrame::new(vec![
            Series::new("i", ids),
            Series::new("ylim", ylim),
            Series::new("ybar", ybar),
        ])?;
        self.write_table("params_plants", &mut df, manifest)?;

        let mut i_col = Vec::new();
        let mut f_col = Vec::new();
        let mut values = Vec::new();
        for plant in &data.plants {
            for (factor, value) in plant.tau.iter() {
                i_col.push(plant.id.to_string());
                f_col.push(factor.code());
                values.push(*value);
            }
        }
        let mut df = DataFrame::new(vec![
            Series::new("i", i_col),
            Series::new("f", f_col),
            Series::new("value", values),
        ])?;
        self.write_table("params_tau", &mut df, manifest)
    }

    fn write_scalars(&self, data: &SteelData, manifest: &mut DatasetManifest) -> Result<()> {
        let mut df = DataFrame::new(vec![
            Series::new("name", &["dbar", "epsilon", "chi"]),
            Series::new("value", &[data.dbar, data.epsilon, data.chi]),
        ])?;
        self.write_table("scalars", &mut df, manifest)
    }
}

/// Write `data` to an Arrow dataset directory, removing partial output on failure.
pub fn write_dataset(
    data: &SteelData,
    output: impl AsRef<Path>,
    seed: Option<u64>,
) -> Result<DatasetManifest> {
    let writer = DatasetWriter::new(output)?;
    match writer.write_dataset(data, seed) {
        Ok(manifest) => Ok(manifest),
        Err(err) => {
            writer.cleanup()?;
            Err(err)
        }
    }
}
