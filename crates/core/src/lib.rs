//! Core ledger primitives for sealchain.
//!
//! This crate provides the fundamental types used throughout the ledger:
//! - SHA-256 hashing and the difficulty predicate
//! - The canonical, boundary-safe encoder that feeds every hash
//! - Fixed-point amounts
//! - Transactions and their integrity tokens
//! - Candidate and sealed blocks

pub mod amount;
pub mod block;
pub mod encoding;
pub mod hash;
pub mod transaction;

// Re-export commonly used types at the crate root
pub use amount::{Amount, AmountError};
pub use block::{Block, BlockHeader, CandidateBlock};
pub use encoding::CanonicalEncoder;
pub use hash::{hash, Hash, H256};
pub use transaction::{Transaction, TransactionError};
