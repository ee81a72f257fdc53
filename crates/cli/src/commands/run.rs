//! Batch submission command.

use super::display::{describe, print_chain, print_report};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use sealchain_chain::{Ledger, LedgerConfig, SealError};
use sealchain_core::{Amount, Transaction};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct RunArgs {
    /// Batch file describing the blocks to seal
    batch: PathBuf,

    /// Write the resulting ledger snapshot to this file (JSON)
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// Print every sealed block
    #[arg(long)]
    show_chain: bool,
}

/// One transfer to sign and submit.
#[derive(Debug, Deserialize)]
struct Transfer {
    sender: String,
    recipient: String,
    amount: Amount,
}

/// Transfers sealed together into one block.
#[derive(Debug, Deserialize)]
struct BatchBlock {
    transfers: Vec<Transfer>,
    /// Name credited with the mining reward, if any.
    #[serde(default)]
    miner: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Batch {
    blocks: Vec<BatchBlock>,
}

/// Outcome of applying a batch.
#[derive(Debug)]
struct Applied {
    ledger: Ledger,
    rejected: usize,
    skipped_blocks: usize,
}

fn load_batch(path: &Path) -> Result<Batch> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read batch file: {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid batch file: {}", path.display()))
}

fn apply(batch: Batch, config: LedgerConfig) -> Result<Applied> {
    let mut ledger = Ledger::with_config(config);
    let mut rejected = 0;
    let mut skipped_blocks = 0;

    for entry in batch.blocks {
        for transfer in entry.transfers {
            let tx = Transaction::new(transfer.sender, transfer.recipient, transfer.amount)
                .signed()?;
            let label = describe(&tx);
            if let Err(e) = ledger.submit_transaction(tx) {
                println!("  {} {} ({})", "-".red(), label, e);
                rejected += 1;
            }
        }

        let sealed = match &entry.miner {
            Some(miner) => ledger.seal_block_rewarding(miner),
            None => ledger.seal_block(),
        };
        match sealed {
            Ok(block) => println!(
                "{}  Sealed block #{} ({} txs) {}",
                "✓".green().bold(),
                block.index(),
                block.tx_count(),
                block.hash.to_hex()[..16].bright_yellow()
            ),
            Err(SealError::EmptyPool) => {
                println!("  {} nothing to seal, skipping block", "-".yellow());
                skipped_blocks += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(Applied {
        ledger,
        rejected,
        skipped_blocks,
    })
}

pub fn run(args: RunArgs, config: LedgerConfig) -> Result<()> {
    let batch = load_batch(&args.batch)?;

    println!("{}", "Applying batch...".bold().cyan());
    let applied = apply(batch, config)?;
    let ledger = &applied.ledger;

    if args.show_chain {
        print_chain(&ledger.chain());
    }

    let stats = ledger.stats();
    println!();
    println!("  Height:       {}", stats.height.to_string().bright_cyan());
    println!(
        "  Sealed txs:   {}",
        stats.sealed_transactions.to_string().bright_cyan()
    );
    println!("  Rejected:     {}", applied.rejected.to_string().bright_cyan());
    println!(
        "  Skipped:      {}",
        applied.skipped_blocks.to_string().bright_cyan()
    );
    print_report(&ledger.validate_chain());

    if let Some(path) = args.export {
        let json = ledger.snapshot().to_json_pretty()?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write snapshot: {}", path.display()))?;
        println!(
            "{}  Exported ledger to: {}",
            "✓".green().bold(),
            path.display().to_string().bright_black()
        );
    }

    Ok(())
}
