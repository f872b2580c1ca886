//! Single-document JSON hand-off, the alternative to the Arrow directory.

use anyhow::{bail, Context, Result};
use cge_core::SteelData;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::manifest::CURRENT_SCHEMA_VERSION;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonDataset {
    pub schema_version: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub data: SteelData,
}

pub fn write_json_dataset(data: &SteelData, path: &Path, seed: Option<u64>) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
    }
    let doc = JsonDataset {
        schema_version: CURRENT_SCHEMA_VERSION.to_string(),
        created_at: Utc::now(),
        seed,
        data: data.clone(),
    };
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &doc).context("serializing dataset to JSON")?;
    writer.flush()?;
    Ok(())
}

pub fn read_json_dataset(path: &Path) -> Result<SteelData> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let doc: JsonDataset = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing dataset {}", path.display()))?;

    let version = semver::Version::parse(&doc.schema_version)
        .with_context(|| format!("invalid schema version '{}'", doc.schema_version))?;
    let current = semver::Version::parse(CURRENT_SCHEMA_VERSION)?;
    if version.major > current.major {
        bail!(
            "Schema v{} is too new (this version supports up to v{})",
            doc.schema_version,
            CURRENT_SCHEMA_VERSION
        );
    }
    Ok(doc.data)
}
