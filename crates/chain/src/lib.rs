//! Ledger orchestration for sealchain.
//!
//! This crate brings the core types and proof of work together into a
//! single-node ledger:
//! - **Ledger**: genesis creation, admission, sealing, block import and validation
//! - **Mempool**: order-preserving pool of pending transactions
//! - **SharedLedger**: one lock around a ledger for multi-threaded callers
//! - **Config**: per-ledger difficulty, reward and pool size
//!
//! # Example
//!
//! ```rust
//! use sealchain_chain::Ledger;
//! use sealchain_core::{Amount, Transaction};
//!
//! let mut ledger = Ledger::new(1);
//!
//! let tx = Transaction::new("Satoshi", "Mike", Amount::parse("5").unwrap())
//!     .signed()
//!     .unwrap();
//! ledger.submit_transaction(tx).unwrap();
//!
//! let block = ledger.seal_block().unwrap();
//! assert_eq!(block.index(), 1);
//! assert!(ledger.validate_chain().valid);
//! ```

pub mod config;
pub mod ledger;
pub mod mempool;
pub mod shared;

// Re-export commonly used types
pub use config::{ConfigError, LedgerConfig};
pub use ledger::{AdmissionError, ImportError, Ledger, LedgerSnapshot, LedgerStats, SealError};
pub use mempool::{Mempool, MempoolError};
pub use shared::SharedLedger;
