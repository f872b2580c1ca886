//! `cge.toml` configuration. Every section and key is optional.

use anyhow::{Context, Result};
use cge_algo::{McpOptions, SweepOptions};
use cge_core::LinearSolverKind;
use cge_io::GeneratorConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CgeConfig {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Data directory paths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Raw technology and factor tables
    #[serde(default = "default_raw_dir")]
    pub raw_dir: PathBuf,
    /// Generated dataset
    #[serde(default = "default_dataset")]
    pub dataset: PathBuf,
    /// Calibration, sweep, report and trade outputs
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            raw_dir: default_raw_dir(),
            dataset: default_dataset(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_raw_dir() -> PathBuf {
    PathBuf::from("data/raw")
}

fn default_dataset() -> PathBuf {
    PathBuf::from("data/generated/steel")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl DataConfig {
    pub fn calibration_file(&self) -> PathBuf {
        self.output_dir.join("calibration.json")
    }

    pub fn sweep_file(&self) -> PathBuf {
        self.output_dir.join("sweep.json")
    }

    pub fn trade_file(&self) -> PathBuf {
        self.output_dir.join("trade_results.csv")
    }

    pub fn runs_dir(&self) -> PathBuf {
        self.output_dir.join("runs")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Convergence threshold on `||Phi||_inf`
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Largest benchmark residual accepted at the calibrated point
    #[serde(default = "default_replication_tolerance")]
    pub replication_tolerance: f64,
    #[serde(default)]
    pub linear_solver: LinearSolverKind,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            max_iterations: default_max_iterations(),
            replication_tolerance: default_replication_tolerance(),
            linear_solver: LinearSolverKind::default(),
        }
    }
}

fn default_tolerance() -> f64 {
    McpOptions::default().tolerance
}

fn default_max_iterations() -> usize {
    McpOptions::default().max_iterations
}

fn default_replication_tolerance() -> f64 {
    cge_algo::sweep::DEFAULT_REPLICATION_TOLERANCE
}

impl SolverConfig {
    pub fn mcp_options(&self) -> McpOptions {
        McpOptions {
            tolerance: self.tolerance,
            max_iterations: self.max_iterations,
            linear_solver: self.linear_solver,
            ..McpOptions::default()
        }
    }

    pub fn sweep_options(&self) -> SweepOptions {
        SweepOptions {
            mcp: self.mcp_options(),
            replication_tolerance: self.replication_tolerance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl LoggingConfig {
    pub fn tracing_level(&self) -> Result<tracing::Level> {
        self.level
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid log level '{}' in [logging]", self.level))
    }
}

/// Load the configuration from `path`, or defaults when the file does not exist.
pub fn load_config(path: &Path) -> Result<CgeConfig> {
    if !path.exists() {
        return Ok(CgeConfig::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: CgeConfig =
        toml::from_str(&contents).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(config)
}
