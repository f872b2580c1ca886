use anyhow::Result;
use cge_cli::cli::Commands;
use cge_cli::config::CgeConfig;

pub mod calibrate;
pub mod generate;
pub mod pipeline;
pub mod report;
pub mod run;
pub mod scenarios;
pub mod trade;

pub fn dispatch(command: &Commands, config: &CgeConfig) -> Result<()> {
    match command {
        Commands::Generate(args) => generate::handle(config, args).map(|_| ()),
        Commands::Calibrate(args) => calibrate::handle(config, args).map(|_| ()),
        Commands::Run(args) => run::handle(config, args).map(|_| ()),
        Commands::Report(args) => report::handle(config, args).map(|_| ()),
        Commands::Trade(args) => trade::handle(config, args).map(|_| ()),
        Commands::Pipeline(args) => pipeline::handle(config, args),
        Commands::Scenarios { command } => scenarios::handle(command),
    }
}
