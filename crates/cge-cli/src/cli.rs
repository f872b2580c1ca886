use clap::{CommandFactory, Parser, Subcommand, ValueEnum, ValueHint};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "cge",
    author,
    version,
    about = "Steel partial-equilibrium model: data generation, calibration and policy scenarios",
    long_about = None
)]
pub struct Cli {
    /// Set the logging level (overrides the config file)
    #[arg(long, global = true)]
    pub log_level: Option<tracing::Level>,

    /// Path to the configuration file; a missing file means defaults
    #[arg(long, global = true, default_value = "cge.toml", value_hint = ValueHint::FilePath)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a plant-level dataset from the raw technology tables
    Generate(GenerateArgs),
    /// Solve the calibration LP and write the benchmark
    Calibrate(CalibrateArgs),
    /// Run the policy scenario sweep
    Run(RunArgs),
    /// Build summary, plant and factor tables from a sweep
    Report(ReportArgs),
    /// Solve the two-region trade model
    Trade(TradeArgs),
    /// Run every stage in order
    Pipeline(PipelineArgs),
    /// Scenario specification utilities
    Scenarios {
        #[command(subcommand)]
        command: ScenariosCommands,
    },
}

#[derive(clap::Args, Debug, Default)]
pub struct GenerateArgs {
    /// Directory holding abar.csv, vbar.csv, rho.csv and kappa.csv
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub raw: Option<PathBuf>,
    /// Output dataset (a directory, or a `.json` file)
    #[arg(short, long, value_hint = ValueHint::AnyPath)]
    pub out: Option<PathBuf>,
    /// Random seed for the plant draw
    #[arg(long)]
    pub seed: Option<u64>,
    /// Number of plants (a multiple of three)
    #[arg(long)]
    pub plants: Option<usize>,
}

#[derive(clap::Args, Debug, Default)]
pub struct CalibrateArgs {
    /// Dataset produced by `cge generate`
    #[arg(long, value_hint = ValueHint::AnyPath)]
    pub dataset: Option<PathBuf>,
    /// Calibration output file
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub out: Option<PathBuf>,
    /// Output format for the printed table
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(clap::Args, Debug, Default)]
pub struct RunArgs {
    /// Dataset produced by `cge generate`
    #[arg(long, value_hint = ValueHint::AnyPath)]
    pub dataset: Option<PathBuf>,
    /// Calibration file; the dataset is calibrated when it does not exist
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub calibration: Option<PathBuf>,
    /// Scenario spec (YAML or JSON); defaults to reference, cap and tax
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub scenarios: Option<PathBuf>,
    /// Sweep output file
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub out: Option<PathBuf>,
    /// Convergence tolerance on the complementarity residual
    #[arg(long)]
    pub tolerance: Option<f64>,
    /// Newton iteration limit per scenario
    #[arg(long)]
    pub max_iterations: Option<usize>,
}

#[derive(clap::Args, Debug, Default)]
pub struct ReportArgs {
    /// Dataset the sweep was solved on
    #[arg(long, value_hint = ValueHint::AnyPath)]
    pub dataset: Option<PathBuf>,
    /// Sweep file produced by `cge run`
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub sweep: Option<PathBuf>,
    /// Directory for the CSV and JSON tables
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub out_dir: Option<PathBuf>,
    /// Output format for the printed summary
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(clap::Args, Debug, Default)]
pub struct TradeArgs {
    /// Scenario spec whose `trade` section replaces the built-in scenarios
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub scenarios: Option<PathBuf>,
    /// Trade results CSV
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub out: Option<PathBuf>,
    /// Output format for the printed table
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(clap::Args, Debug, Default)]
pub struct PipelineArgs {
    /// Directory holding the raw technology tables
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub raw: Option<PathBuf>,
    /// Scenario spec (YAML or JSON)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub scenarios: Option<PathBuf>,
    /// Random seed for the plant draw
    #[arg(long)]
    pub seed: Option<u64>,
    /// Skip the trade model
    #[arg(long)]
    pub skip_trade: bool,
}

#[derive(Subcommand, Debug)]
pub enum ScenariosCommands {
    /// Validate a scenario spec
    Validate {
        /// Scenario spec (YAML or JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        spec: PathBuf,
    },
    /// List resolved scenarios
    List {
        /// Scenario spec; the default sweep when omitted
        #[arg(value_hint = ValueHint::FilePath)]
        spec: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

/// How tables are printed to stdout.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned columns
    #[default]
    Table,
    /// Pretty-printed JSON
    Json,
    /// Comma-separated values
    Csv,
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}
