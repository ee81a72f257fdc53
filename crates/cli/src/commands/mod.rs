//! CLI commands module.

use anyhow::{Context, Result};
use clap::Subcommand;
use sealchain_chain::LedgerConfig;
use std::path::Path;

mod demo;
mod display;
mod run;
mod validate;

#[derive(Subcommand)]
pub enum Commands {
    /// Replay the sample ledger, then tamper with it and re-validate
    Demo(demo::DemoArgs),
    /// Submit and seal batches of transfers from a JSON file
    Run(run::RunArgs),
    /// Validate an exported ledger snapshot and restore it
    Validate(validate::ValidateArgs),
}

pub fn run(cmd: Commands, config: Option<&Path>) -> Result<()> {
    match cmd {
        Commands::Demo(args) => demo::run(args, load_config(config)?),
        Commands::Run(args) => run::run(args, load_config(config)?),
        Commands::Validate(args) => validate::run(args, load_config(config)?),
    }
}

/// Load the ledger config, or the defaults when no file is given.
fn load_config(path: Option<&Path>) -> Result<LedgerConfig> {
    match path {
        Some(path) => LedgerConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display())),
        None => Ok(LedgerConfig::default()),
    }
}
