//! Sample ledger walkthrough.

use super::display::{describe, print_chain, print_report};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use sealchain_chain::{Ledger, LedgerConfig, LedgerSnapshot};
use sealchain_core::{Amount, Transaction};

#[derive(Args)]
pub struct DemoArgs {
    /// Override the configured difficulty
    #[arg(short, long)]
    difficulty: Option<u32>,
}

const ROUNDS: &[&[(&str, &str, &str)]] = &[
    &[
        ("Satoshi", "Mike", "5"),
        ("Mike", "Satoshi", "1"),
        ("Satoshi", "Hal Finney", "5"),
    ],
    &[("Mike", "Alice", "100"), ("Alice", "Bob", "-0.5")],
    &[("Vine", "Mark", "0.01")],
];

pub fn run(args: DemoArgs, mut config: LedgerConfig) -> Result<()> {
    if let Some(difficulty) = args.difficulty {
        config.difficulty = difficulty;
    }

    println!("{}", "Building sample ledger...".bold().cyan());
    let mut ledger = Ledger::with_config(config);
    println!(
        "{}  Mined genesis block at difficulty {}",
        "✓".green().bold(),
        ledger.difficulty().to_string().bright_cyan()
    );

    for round in ROUNDS {
        for &(sender, recipient, amount) in round.iter() {
            let amount = Amount::parse(amount)
                .with_context(|| format!("Invalid amount: {}", amount))?;
            let tx = Transaction::new(sender, recipient, amount).signed()?;
            let label = describe(&tx);
            match ledger.submit_transaction(tx) {
                Ok(()) => println!("  {} {}", "+".green(), label),
                Err(e) => println!("  {} {} ({})", "-".red(), label, e),
            }
        }

        let block = ledger.seal_block()?;
        println!(
            "{}  Sealed block #{} with {} transactions",
            "✓".green().bold(),
            block.index(),
            block.tx_count()
        );
    }

    let mut snapshot = ledger.snapshot();
    print_chain(&snapshot.chain);

    println!("{}", "Validating...".bold());
    print_report(&ledger.validate_chain());

    println!();
    println!("{}", "Exporting and restoring...".bold());
    let json = snapshot.to_json_pretty()?;
    let imported = LedgerSnapshot::from_json(&json)?;
    let restored = Ledger::from_snapshot(imported, ledger.config().clone())?;
    println!(
        "{}  Restored {} blocks from {} bytes of JSON",
        "✓".green().bold(),
        restored.len().to_string().bright_cyan(),
        json.len()
    );

    println!();
    println!("{}", "Tampering with block #1 of a copy...".bold());
    let tampered = &mut snapshot.chain[1].transactions[0];
    tampered.amount = Amount::parse("999")?;
    println!("  {} now reads {}", "tx 1".bright_black(), describe(tampered));
    print_report(&snapshot.validate());

    Ok(())
}
