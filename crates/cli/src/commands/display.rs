//! Terminal rendering of blocks and validation reports.

use colored::Colorize;
use sealchain_consensus::ValidationReport;
use sealchain_core::{Block, Transaction};

/// Print every block, genesis first.
pub fn print_chain(chain: &[Block]) {
    println!();
    println!("{}", "Chain:".bold().cyan());
    for block in chain {
        print_block(block);
    }
    println!();
}

/// Print one block and its transactions.
pub fn print_block(block: &Block) {
    println!();
    println!(
        "  {} {}",
        format!("#{}", block.index()).bright_cyan(),
        block.hash.to_hex().bright_yellow()
    );
    println!("    Previous:     {}", block.previous_hash().to_hex().bright_black());
    println!("    Nonce:        {}", block.nonce().to_string().bright_cyan());
    println!(
        "    Created:      {}",
        block.header.created_at.to_rfc3339().bright_black()
    );
    println!(
        "    Transactions: {}",
        block.tx_count().to_string().bright_cyan()
    );
    for (i, tx) in block.transactions.iter().enumerate() {
        println!("      {} {}", format!("{}.", i + 1).bright_black(), describe(tx));
    }
}

/// One-line summary of a transfer.
pub fn describe(tx: &Transaction) -> String {
    let sender = if tx.is_reward() {
        "<reward>".to_string()
    } else {
        tx.sender.clone()
    };
    format!("{} -> {} : {}", sender, tx.recipient, tx.amount)
}

/// Print the outcome of a chain validation.
pub fn print_report(report: &ValidationReport) {
    if report.valid {
        println!("{}  Chain is valid", "✓".green().bold());
        return;
    }

    let index = report
        .first_failing_index
        .map(|i| i.to_string())
        .unwrap_or_else(|| "?".to_string());
    let reason = report
        .fault
        .map(|f| f.to_string())
        .unwrap_or_else(|| "unknown fault".to_string());
    println!(
        "{}  Chain is invalid at block {}: {}",
        "✗".red().bold(),
        index.bright_cyan(),
        reason
    );
}
