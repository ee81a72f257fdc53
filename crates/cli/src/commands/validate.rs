//! Exported snapshot validation command.

use super::display::{print_chain, print_report};
use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use sealchain_chain::{Ledger, LedgerConfig, LedgerSnapshot};
use sealchain_consensus::ValidationReport;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct ValidateArgs {
    /// Snapshot file written by `sealchain run --export`
    snapshot: PathBuf,

    /// Print every block before validating
    #[arg(long)]
    show_chain: bool,
}

fn load_snapshot(path: &Path) -> Result<LedgerSnapshot> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
    LedgerSnapshot::from_json(&raw)
        .with_context(|| format!("Invalid snapshot file: {}", path.display()))
}

fn check(path: &Path) -> Result<(LedgerSnapshot, ValidationReport)> {
    let snapshot = load_snapshot(path)?;
    let report = snapshot.validate();
    Ok((snapshot, report))
}

pub fn run(args: ValidateArgs, config: LedgerConfig) -> Result<()> {
    let (snapshot, report) = check(&args.snapshot)?;

    println!(
        "{} {} blocks at difficulty {}",
        "Validating".bold().cyan(),
        snapshot.chain.len().to_string().bright_cyan(),
        snapshot.difficulty.to_string().bright_cyan()
    );
    if args.show_chain {
        print_chain(&snapshot.chain);
    }
    print_report(&report);

    if !report.valid {
        bail!("snapshot failed validation");
    }

    let ledger = Ledger::from_snapshot(snapshot, config)
        .context("Snapshot passed validation but could not be restored")?;
    let stats = ledger.stats();
    println!(
        "{}  Restored ledger at height {} with {} pending transactions",
        "✓".green().bold(),
        stats.height.to_string().bright_cyan(),
        stats.pending_transactions.to_string().bright_cyan()
    );
    Ok(())
}
