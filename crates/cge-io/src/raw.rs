//! Readers for the raw technology and factor tables.
//!
//! The raw directory holds four CSV files:
//! - `abar.csv` with columns `t,f,value`
//! - `vbar.csv`, `rho.csv`, `kappa.csv` with columns `f,value`

use cge_core::{
    CgeError, CgeResult, Factor, FactorParams, FactorTable, TechTable, Technology, TechnologyData,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ABAR_FILE: &str = "abar.csv";
pub const VBAR_FILE: &str = "vbar.csv";
pub const RHO_FILE: &str = "rho.csv";
pub const KAPPA_FILE: &str = "kappa.csv";

#[derive(Debug, Deserialize, Serialize)]
struct CoefficientRecord {
    t: String,
    f: String,
    value: f64,
}

#[derive(Debug, Deserialize, Serialize)]
struct FactorRecord {
    f: String,
    value: f64,
}

/// Read all raw tables from `dir` and validate that every entry is present.
pub fn read_technology_data(dir: &Path) -> CgeResult<TechnologyData> {
    let abar = read_abar(&dir.join(ABAR_FILE))?;
    let vbar = read_factor_column(&dir.join(VBAR_FILE))?;
    let rho = read_factor_column(&dir.join(RHO_FILE))?;
    let kappa = read_factor_column(&dir.join(KAPPA_FILE))?;

    let factors = FactorTable::from_fn(|f| FactorParams {
        vbar: vbar[f],
        rho: rho[f],
        kappa: kappa[f],
    });
    Ok(TechnologyData { abar, factors })
}

fn open_csv(path: &Path) -> CgeResult<csv::Reader<std::fs::File>> {
    if !path.exists() {
        return Err(CgeError::MissingInput(path.to_path_buf()));
    }
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| CgeError::Parse(format!("opening {}: {e}", path.display())))
}

fn read_abar(path: &Path) -> CgeResult<TechTable<FactorTable<f64>>> {
    let mut rdr = open_csv(path)?;
    let mut table: TechTable<FactorTable<Option<f64>>> = TechTable::default();

    for (line, result) in rdr.deserialize::<CoefficientRecord>().enumerate() {
        let record = result
            .map_err(|e| CgeError::Parse(format!("{} row {}: {e}", path.display(), line + 1)))?;
        let tech: Technology = record.t.parse()?;
        let factor: Factor = record.f.parse()?;
        let slot = &mut table[tech][factor];
        if slot.is_some() {
            return Err(CgeError::Validation(format!(
                "{}: duplicate entry for ({}, {})",
                path.display(),
                tech.code(),
                factor.code()
            )));
        }
        *slot = Some(record.value);
    }

    let mut abar = TechTable::<FactorTable<f64>>::default();
    for tech in Technology::ALL {
        for factor in Factor::ALL {
            abar[tech][factor] = table[tech][factor].ok_or_else(|| {
                CgeError::Validation(format!(
                    "{}: no entry for ({}, {})",
                    path.display(),
                    tech.code(),
                    factor.code()
                ))
            })?;
        }
    }
    Ok(abar)
}

fn read_factor_column(path: &Path) -> CgeResult<FactorTable<f64>> {
    let mut rdr = open_csv(path)?;
    let mut column: FactorTable<Option<f64>> = FactorTable::default();

    for (line, result) in rdr.deserialize::<FactorRecord>().enumerate() {
        let record = result
            .map_err(|e| CgeError::Parse(format!("{} row {}: {e}", path.display(), line + 1)))?;
        let factor: Factor = record.f.parse()?;
        if column[factor].replace(record.value).is_some() {
            return Err(CgeError::Validation(format!(
                "{}: duplicate entry for {}",
                path.display(),
                factor.code()
            )));
        }
    }

    let mut values = FactorTable::<f64>::default();
    for factor in Factor::ALL {
        values[factor] = column[factor].ok_or_else(|| {
            CgeError::Validation(format!("{}: no entry for {}", path.display(), factor.code()))
        })?;
    }
    Ok(values)
}

/// Write `data` as the four raw CSV tables under `dir`, returning the paths written.
pub fn write_raw_tables(dir: &Path, data: &TechnologyData) -> CgeResult<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let csv_err = |path: &Path, e: csv::Error| CgeError::Other(format!("{}: {e}", path.display()));

    let abar_path = dir.join(ABAR_FILE);
    let mut writer = csv::Writer::from_path(&abar_path).map_err(|e| csv_err(&abar_path, e))?;
    for (tech, row) in data.abar.iter() {
        for (factor, value) in row.iter() {
            writer
                .serialize(CoefficientRecord {
                    t: tech.code().to_string(),
                    f: factor.code().to_string(),
                    value: *value,
                })
                .map_err(|e| csv_err(&abar_path, e))?;
        }
    }
    writer.flush()?;

    let mut written = vec![abar_path];
    let columns: [(&str, fn(&FactorParams) -> f64); 3] = [
        (VBAR_FILE, |p| p.vbar),
        (RHO_FILE, |p| p.rho),
        (KAPPA_FILE, |p| p.kappa),
    ];
    for (file, get) in columns {
        let path = dir.join(file);
        let mut writer = csv::Writer::from_path(&path).map_err(|e| csv_err(&path, e))?;
        for (factor, params) in data.factors.iter() {
            writer
                .serialize(FactorRecord {
                    f: factor.code().to_string(),
                    value: get(params),
                })
                .map_err(|e| csv_err(&path, e))?;
        }
        writer.flush()?;
        written.push(path);
    }
    Ok(written)
}

/// Reference technology and factor data shipped in `data/raw`.
pub fn reference_technology() -> TechnologyData {
    const ABAR: [[f64; 5]; 3] = [
        [1.50, 0.75, 0.20, 0.15, 0.05],
        [0.05, 0.05, 1.05, 0.55, 0.10],
        [1.40, 0.05, 0.15, 0.60, 0.35],
    ];
    const VBAR: [f64; 5] = [110.0, 180.0, 320.0, 80.0, 35.0];
    const RHO: [f64; 5] = [1.0, 1.5, 0.5, 2.0, 1.0];
    const KAPPA: [f64; 5] = [0.05, 2.4, 0.01, 0.4, 0.2];

    TechnologyData {
        abar: TechTable(ABAR.map(FactorTable)),
        factors: FactorTable::from_fn(|f| FactorParams {
            vbar: VBAR[f.index()],
            rho: RHO[f.index()],
            kappa: KAPPA[f.index()],
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn raw_tables_round_trip() {
        let dir = TempDir::new().unwrap();
        let reference = reference_technology();
        write_raw_tables(dir.path(), &reference).unwrap();
        let read = read_technology_data(dir.path()).unwrap();
        assert_eq!(read, reference);
    }

    #[test]
    fn missing_file_is_named() {
        let dir = TempDir::new().unwrap();
        write_raw_tables(dir.path(), &reference_technology()).unwrap();
        std::fs::remove_file(dir.path().join(RHO_FILE)).unwrap();

        let err = read_technology_data(dir.path()).unwrap_err();
        assert!(matches!(err, CgeError::MissingInput(_)));
        assert!(err.to_string().contains("rho.csv"));
    }

    #[test]
    fn incomplete_table_is_rejected() {
        let dir = TempDir::new().unwrap();
        write_raw_tables(dir.path(), &reference_technology()).unwrap();
        std::fs::write(dir.path().join(VBAR_FILE), "f,value\niore,110\ncoal,180\n").unwrap();

        let err = read_technology_data(dir.path()).unwrap_err();
        assert!(matches!(err, CgeError::Validation(_)));
        assert!(err.to_string().contains("scrp"));
    }

    #[test]
    fn unknown_factor_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        write_raw_tables(dir.path(), &reference_technology()).unwrap();
        std::fs::write(dir.path().join(KAPPA_FILE), "f,value\noil,1.0\n").unwrap();
        assert!(matches!(
            read_technology_data(dir.path()),
            Err(CgeError::Parse(_))
        ));
    }
}
