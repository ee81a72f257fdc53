//! Proof of Work consensus for sealchain.
//!
//! This crate provides:
//! - Nonce search against a leading-zero difficulty, with cooperative cancellation
//! - Side-effect-free proof checks
//! - Read-only full-chain validation with a structured report
//!
//! # Example
//!
//! ```rust
//! use sealchain_consensus::{ChainValidator, Miner};
//! use sealchain_core::CandidateBlock;
//!
//! let miner = Miner::new(1);
//! let genesis = miner.mine_to_completion(CandidateBlock::genesis());
//!
//! let report = ChainValidator::validate(&[genesis], 1);
//! assert!(report.valid);
//! ```

pub mod pow;
pub mod validator;

// Re-export commonly used types
pub use pow::{CancelToken, Cancellation, Miner, MiningError, Uncancellable, MAX_DIFFICULTY};
pub use validator::{ChainFault, ChainValidator, ValidationReport};
