//! Manifest for Arrow dataset directories with version tracking and integrity validation.
//!
//! Each dataset directory contains a `manifest.json` file that:
//! - Tracks the schema version for compatibility checks
//! - Stores SHA256 checksums and row counts of all table files
//! - Records the generator seed for provenance

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::path::Path;

/// Current schema version (semver)
pub const CURRENT_SCHEMA_VERSION: &str = "1.0.0";

pub const MANIFEST_FILE: &str = "manifest.json";

/// Table names of a complete dataset.
pub const REQUIRED_TABLES: &[&str] = &[
    "sets_technologies",
    "sets_factors",
    "sets_plants",
    "params_abar",
    "params_factors",
    "params_plants",
    "params_tau",
    "scalars",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetManifest {
    pub schema_version: String,

    pub created_at: DateTime<Utc>,

    /// Version of the tool that wrote the dataset
    pub generator_version: String,

    /// RNG seed used for the plant draw, if the dataset was generated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    pub tables: BTreeMap<String, TableInfo>,
}

/// Metadata for a single Arrow table file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    pub sha256: String,
    pub row_count: u64,
}

impl DatasetManifest {
    pub fn new(generator_version: impl Into<String>, seed: Option<u64>) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION.to_string(),
            created_at: Utc::now(),
            generator_version: generator_version.into(),
            seed,
            tables: BTreeMap::new(),
        }
    }

    pub fn add_table(&mut self, name: impl Into<String>, info: TableInfo) {
        self.tables.insert(name.into(), info);
    }

    /// Accept manifests from the same or an older major version.
    pub fn is_compatible(&self) -> Result<()> {
        use semver::Version;

        let manifest_version = Version::parse(&self.schema_version)
            .map_err(|e| anyhow!("Invalid schema version in manifest: {}", e))?;
        let current_version = Version::parse(CURRENT_SCHEMA_VERSION)?;

        if manifest_version.major > current_version.major {
            bail!(
                "Schema v{} is too new (this version supports up to v{})",
                self.schema_version,
                CURRENT_SCHEMA_VERSION
            );
        }
        Ok(())
    }

    pub fn verify_all_tables(&self) -> Result<()> {
        for required in REQUIRED_TABLES {
            if !self.tables.contains_key(*required) {
                bail!("Missing required table: {}", required);
            }
        }
        Ok(())
    }

    /// Hash every required table file and compare with the recorded checksum.
    pub fn validate_checksums(&self, base_path: &Path) -> Result<()> {
        for table in REQUIRED_TABLES {
            let info = self.table(table)?;
            let path = base_path.join(format!("{table}.arrow"));
            let actual = compute_sha256(&path)?;
            if actual != info.sha256 {
                bail!(
                    "Checksum mismatch for table '{table}': manifest has {}, file has {actual}",
                    info.sha256
                );
            }
        }
        Ok(())
    }

    pub fn table(&self, name: &str) -> Result<&TableInfo> {
        self.tables
            .get(name)
            .ok_or_else(|| anyhow!("manifest has no entry for table '{name}'"))
    }
}

/// Hex SHA-256 of a file's contents.
pub fn compute_sha256(path: &Path) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("opening {} for hashing", path.display()))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).with_context(|| format!("hashing {}", path.display()))?;
    Ok(format!("{:x}", hasher.finalize()))
}
