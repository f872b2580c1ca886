//! # cge-io: data hand-off for the steel model
//!
//! - [`raw`] - raw technology/factor CSV tables
//! - [`generator`] - seeded synthetic plant data
//! - [`dataset_writer`] / [`dataset_reader`] - Arrow IPC dataset directory with manifest
//! - [`json`] - single-file JSON dataset
//! - [`results`] - CSV/JSON result tables

pub mod dataset_reader;
pub mod dataset_writer;
pub mod generator;
pub mod json;
pub mod manifest;
pub mod raw;
pub mod results;

use cge_core::{CgeError, CgeResult, SteelData};
use std::path::Path;

pub use dataset_reader::{read_dataset, DatasetReader};
pub use dataset_writer::{write_dataset, DatasetWriter};
pub use generator::{generate, GeneratorConfig};
pub use json::{read_json_dataset, write_json_dataset};
pub use manifest::{DatasetManifest, TableInfo};
pub use raw::{read_technology_data, reference_technology, write_raw_tables};

/// On-disk representation of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    Arrow,
    Json,
}

impl DatasetFormat {
    /// `.json` files are JSON documents; anything else is an Arrow directory.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => DatasetFormat::Json,
            _ => DatasetFormat::Arrow,
        }
    }
}

/// Load and validate a dataset, picking the format from the path.
pub fn load_dataset(path: &Path) -> CgeResult<SteelData> {
    if !path.exists() {
        return Err(CgeError::MissingInput(path.to_path_buf()));
    }
    let data = match DatasetFormat::from_path(path) {
        DatasetFormat::Arrow => read_dataset(path),
        DatasetFormat::Json => read_json_dataset(path),
    }
    .map_err(|e| CgeError::Parse(format!("{e:#}")))?;
    data.validate()?;
    Ok(data)
}

/// Write a dataset in the format implied by the path.
pub fn save_dataset(data: &SteelData, path: &Path, seed: Option<u64>) -> CgeResult<()> {
    match DatasetFormat::from_path(path) {
        DatasetFormat::Arrow => write_dataset(data, path, seed).map(|_| ()),
        DatasetFormat::Json => write_json_dataset(data, path, seed),
    }
    .map_err(CgeError::from)
}
