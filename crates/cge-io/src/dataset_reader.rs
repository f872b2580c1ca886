//! Arrow dataset directory reader.
//!
//! Opening a directory validates the manifest (schema compatibility, required
//! tables, checksums) before any table is decoded.

use anyhow::{anyhow, bail, Context, Result};
use cge_core::{
    Factor, FactorParams, FactorTable, Plant, PlantId, SteelData, TechTable, Technology,
};
use polars::io::ipc::IpcReader;
use polars::prelude::{DataFrame, SerReader};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::manifest::{DatasetManifest, MANIFEST_FILE};

#[derive(Debug)]
pub struct DatasetReader {
    base_path: PathBuf,
    manifest: DatasetManifest,
}

impl DatasetReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        if !base_path.is_dir() {
            bail!(
                "Arrow dataset directory not found or is not a directory: {}",
                base_path.display()
            );
        }

        let manifest = Self::load_manifest(&base_path).context("loading manifest.json")?;
        manifest
            .is_compatible()
            .context("checking schema compatibility")?;
        manifest
            .verify_all_tables()
            .context("verifying required tables")?;
        manifest
            .validate_checksums(&base_path)
            .context("validating file checksums")?;

        Ok(Self {
            base_path,
            manifest,
        })
    }

    fn load_manifest(base_path: &Path) -> Result<DatasetManifest> {
        let manifest_path = base_path.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            bail!(
                "manifest.json not found in {}\n\
                 This directory may be incomplete or corrupted (incomplete write)",
                base_path.display()
            );
        }
        let file = File::open(&manifest_path)
            .with_context(|| format!("opening manifest: {}", manifest_path.display()))?;
        serde_json::from_reader(file).context("parsing manifest.json")
    }

    pub fn manifest(&self) -> &DatasetManifest {
        &self.manifest
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn table_path(&self, table_name: &str) -> PathBuf {
        self.base_path.join(format!("{}.arrow", table_name))
    }

    pub fn load_table(&self, table_name: &str) -> Result<DataFrame> {
        let path = self.table_path(table_name);
        let file = File::open(&path)
            .with_context(|| format!("opening table file {}", path.display()))?;
        let df = IpcReader::new(file)
            .finish()
            .with_context(|| format!("reading table {}", table_name))?;
        let expected = self.manifest.table(table_name)?.row_count;
        if df.height() as u64 != expected {
            bail!(
                "table {} has {} rows, manifest records {}",
                table_name,
                df.height(),
                expected
            );
        }
        Ok(df)
    }

    /// Decode the tables into a [`SteelData`].
    pub fn read_data(&self) -> Result<SteelData> {
        let abar = self.read_abar()?;
        let factors = self.read_factors()?;
        let plants = self.read_plants()?;
        let scalars = self.read_scalars()?;
        let scalar = |name: &str| {
            scalars
                .get(name)
                .copied()
                .ok_or_else(|| anyhow!("scalars table has no '{}' row", name))
        };

        Ok(SteelData {
            abar,
            factors,
            plants,
            dbar: scalar("dbar")?,
            epsilon: scalar("epsilon")?,
            chi: scalar("chi")?,
        })
    }

    fn read_abar(&self) -> Result<TechTable<FactorTable<f64>>> {
        let df = self.load_table("params_abar")?;
        let t = df.column("t")?.utf8()?;
        let f = df.column("f")?.utf8()?;
        let value = df.column("value")?.f64()?;

        let mut entries = HashMap::new();
        for row in 0..df.height() {
            let tech: Technology = cell(t.get(row), "params_abar.t", row)?.parse()?;
            let factor: Factor = cell(f.get(row), "params_abar.f", row)?.parse()?;
            entries.insert((tech, factor), cell(value.get(row), "params_abar.value", row)?);
        }

        let mut abar = TechTable::<FactorTable<f64>>::default();
        for tech in Technology::ALL {
            for factor in Factor::ALL {
                abar[tech][factor] = *entries
                    .get(&(tech, factor))
                    .ok_or_else(|| anyhow!("params_abar has no entry for ({tech}, {factor})"))?;
            }
        }
        Ok(abar)
    }

    fn read_factors(&self) -> Result<FactorTable<FactorParams>> {
        let df = self.load_table("params_factors")?;
        let f = df.column("f")?.utf8()?;
        let vbar = df.column("vbar")?.f64()?;
        let rho = df.column("rho")?.f64()?;
        let kappa = df.column("kappa")?.f64()?;

        let mut params: FactorTable<Option<FactorParams>> = FactorTable::default();
        for row in 0..df.height() {
            let factor: Factor = cell(f.get(row), "params_factors.f", row)?.parse()?;
            params[factor] = Some(FactorParams {
                vbar: cell(vbar.get(row), "params_factors.vbar", row)?,
                rho: cell(rho.get(row), "params_factors.rho", row)?,
                kappa: cell(kappa.get(row), "params_factors.kappa", row)?,
            });
        }

        let mut out = FactorTable::<FactorParams>::default();
        for factor in Factor::ALL {
            out[factor] =
                params[factor].ok_or_else(|| anyhow!("params_factors has no row for {factor}"))?;
        }
        Ok(out)
    }

    fn read_plants(&self) -> Result<Vec<Plant>> {
        let sets = self.load_table("sets_plants")?;
        let ids = sets.column("i")?.utf8()?;
        let techs = sets.column("t")?.utf8()?;

        let params = self.load_table("params_plants")?;
        let p_ids = params.column("i")?.utf8()?;
        let ylim = params.column("ylim")?.f64()?;
        let ybar = params.column("ybar")?.f64()?;
        let mut levels = HashMap::new();
        for row in 0..params.height() {
            let id: PlantId = cell(p_ids.get(row), "params_plants.i", row)?.parse()?;
            levels.insert(
                id,
                (
                    cell(ylim.get(row), "params_plants.ylim", row)?,
                    cell(ybar.get(row), "params_plants.ybar", row)?,
                ),
            );
        }

        let tau_df = self.load_table("params_tau")?;
        let tau_i = tau_df.column("i")?.utf8()?;
        let tau_f = tau_df.column("f")?.utf8()?;
        let tau_v = tau_df.column("value")?.f64()?;
        let mut taus: BTreeMap<PlantId, FactorTable<Option<f64>>> = BTreeMap::new();
        for row in 0..tau_df.height() {
            let id: PlantId = cell(tau_i.get(row), "params_tau.i", row)?.parse()?;
            let factor: Factor = cell(tau_f.get(row), "params_tau.f", row)?.parse()?;
            taus.entry(id).or_default()[factor] = Some(cell(tau_v.get(row), "params_tau.value", row)?);
        }

        let mut plants = Vec::with_capacity(sets.height());
        for row in 0..sets.height() {
            let id: PlantId = cell(ids.get(row), "sets_plants.i", row)?.parse()?;
            let technology: Technology = cell(techs.get(row), "sets_plants.t", row)?.parse()?;
            let (ylim, ybar) = *levels
                .get(&id)
                .ok_or_else(|| anyhow!("params_plants has no row for plant {id}"))?;
            let partial = taus.get(&id);
            let mut tau = FactorTable::<f64>::default();
            for factor in Factor::ALL {
                tau[factor] = partial
                    .and_then(|t| t[factor])
                    .ok_or_else(|| anyhow!("params_tau has no entry for ({id}, {factor})"))?;
            }
            plants.push(Plant {
                id,
                technology,
                ylim,
                ybar,
                tau,
            });
        }
        Ok(plants)
    }

    fn read_scalars(&self) -> Result<HashMap<String, f64>> {
        let df = self.load_table("scalars")?;
        let names = df.column("name")?.utf8()?;
        let values = df.column("value")?.f64()?;
        let mut out = HashMap::new();
        for row in 0..df.height() {
            out.insert(
                cell(names.get(row), "scalars.name", row)?.to_string(),
                cell(values.get(row), "scalars.value", row)?,
            );
        }
        Ok(out)
    }
}

fn cell<T>(value: Option<T>, column: &str, row: usize) -> Result<T> {
    value.ok_or_else(|| anyhow!("null value in {} at row {}", column, row))
}

/// Open, validate and decode an Arrow dataset directory.
pub fn read_dataset(path: impl AsRef<Path>) -> Result<SteelData> {
    DatasetReader::open(path)?.read_data()
}
