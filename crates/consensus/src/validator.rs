//! Read-only chain validation.
//!
//! Validation walks the chain from genesis and reports the first block that
//! breaks a rule. An invalid chain is an expected outcome (for example after
//! tampering), so it is reported as data rather than as an error.

use crate::pow::Miner;
use sealchain_core::{Block, Hash};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::warn;

/// The rule a block broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainFault {
    /// There is no genesis block to start from.
    EmptyChain,
    /// The block's index does not match its position.
    IndexMismatch { expected: u64, got: u64 },
    /// The stored hash differs from the hash of the stored fields.
    HashMismatch,
    /// The stored hash does not meet the difficulty.
    InsufficientWork,
    /// `previous_hash` does not point at the preceding block.
    BrokenLink,
    /// A contained transaction fails its integrity check.
    InvalidTransaction { position: usize },
    /// A contained transaction was already sealed, here or in an earlier block.
    ReplayedTransaction { position: usize },
}

impl fmt::Display for ChainFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyChain => write!(f, "chain has no genesis block"),
            Self::IndexMismatch { expected, got } => {
                write!(f, "block index mismatch (expected {expected}, got {got})")
            }
            Self::HashMismatch => write!(f, "block hash does not match its contents"),
            Self::InsufficientWork => write!(f, "block hash does not meet the difficulty"),
            Self::BrokenLink => write!(f, "previous hash does not match the preceding block"),
            Self::InvalidTransaction { position } => {
                write!(f, "transaction {position} is not validly signed")
            }
            Self::ReplayedTransaction { position } => {
                write!(f, "transaction {position} was already sealed")
            }
        }
    }
}

/// Outcome of a full-chain validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Whether every block passed.
    pub valid: bool,
    /// Index of the first block that failed.
    pub first_failing_index: Option<u64>,
    /// What went wrong with that block.
    pub fault: Option<ChainFault>,
}

impl ValidationReport {
    /// A report for a chain that passed every check.
    pub fn passed() -> Self {
        Self {
            valid: true,
            first_failing_index: None,
            fault: None,
        }
    }

    /// A report for a chain that failed at `index`.
    pub fn failed(index: u64, fault: ChainFault) -> Self {
        Self {
            valid: false,
            first_failing_index: Some(index),
            fault: Some(fault),
        }
    }
}

/// Chain validator.
pub struct ChainValidator;

impl ChainValidator {
    /// Check one block against its expected position and predecessor hash.
    ///
    /// The hash is recomputed exactly once, from the block's stored fields.
    pub fn validate_block(
        block: &Block,
        expected_index: u64,
        expected_previous: &Hash,
        miner: &Miner,
    ) -> Result<(), ChainFault> {
        if block.index() != expected_index {
            return Err(ChainFault::IndexMismatch {
                expected: expected_index,
                got: block.index(),
            });
        }

        if block.compute_hash() != block.hash {
            return Err(ChainFault::HashMismatch);
        }

        if !block.hash.meets_difficulty(miner.difficulty()) {
            return Err(ChainFault::InsufficientWork);
        }

        if block.previous_hash() != *expected_previous {
            return Err(ChainFault::BrokenLink);
        }

        if let Some(position) = block.first_invalid_transaction() {
            return Err(ChainFault::InvalidTransaction { position });
        }

        Ok(())
    }

    /// Position of the first transaction whose integrity token is in `sealed`
    /// or repeats earlier in the same block. Rewards carry no token and are
    /// never reported.
    pub fn first_replayed_transaction(block: &Block, sealed: &HashSet<Hash>) -> Option<usize> {
        let mut seen = HashSet::new();
        block.transactions.iter().position(|tx| match tx.integrity_token {
            Some(token) => sealed.contains(&token) || !seen.insert(token),
            None => false,
        })
    }

    /// Walk the chain from genesis and stop at the first failing block.
    ///
    /// Genesis gets the same checks as every other block, with the sentinel
    /// [`Hash::GENESIS_PARENT`] as its expected predecessor. Nothing in
    /// `chain` is modified; the running predecessor hash and the set of
    /// sealed tokens are locals.
    pub fn validate(chain: &[Block], difficulty: u32) -> ValidationReport {
        if chain.is_empty() {
            warn!("chain validation failed: no genesis block");
            return ValidationReport::failed(0, ChainFault::EmptyChain);
        }

        let miner = Miner::new(difficulty);
        let mut expected_previous = Hash::GENESIS_PARENT;
        let mut sealed = HashSet::new();

        for (position, block) in chain.iter().enumerate() {
            let index = position as u64;
            let outcome = Self::validate_block(block, index, &expected_previous, &miner)
                .and_then(|()| match Self::first_replayed_transaction(block, &sealed) {
                    Some(position) => Err(ChainFault::ReplayedTransaction { position }),
                    None => Ok(()),
                });
            if let Err(fault) = outcome {
                warn!(index, %fault, "chain validation failed");
                return ValidationReport::failed(index, fault);
            }
            expected_previous = block.hash;
            sealed.extend(block.tokens());
        }

        ValidationReport::passed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pow::CancelToken;
    use chrono::{DateTime, TimeZone, Utc};
    use sealchain_core::{Amount, CandidateBlock, Transaction};

    const DIFFICULTY: u32 = 1;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn transfer(sender: &str, recipient: &str, amount: &str, secs: i64) -> Transaction {
        Transaction::with_timestamp(sender, recipient, Amount::parse(amount).unwrap(), at(secs))
            .signed()
            .unwrap()
    }

    fn mine(candidate: CandidateBlock) -> Block {
        Miner::new(DIFFICULTY).mine(candidate, &CancelToken::new()).unwrap()
    }

    fn build_chain(len: usize) -> Vec<Block> {
        let mut chain = vec![mine(CandidateBlock::with_timestamp(
            0,
            Hash::GENESIS_PARENT,
            vec![],
            at(0),
        ))];
        for i in 1..len {
            let prev = chain[i - 1].hash;
            let secs = i as i64;
            let txs = vec![transfer("a", "b", "1", secs), transfer("b", "c", "0.5", secs)];
            chain.push(mine(CandidateBlock::with_timestamp(i as u64, prev, txs, at(i as i64))));
        }
        chain
    }

    #[test]
    fn test_genesis_only_chain_is_valid() {
        let report = ChainValidator::validate(&build_chain(1), DIFFICULTY);
        assert_eq!(report, ValidationReport::passed());
    }

    #[test]
    fn test_valid_chain() {
        let report = ChainValidator::validate(&build_chain(4), DIFFICULTY);
        assert!(report.valid);
        assert_eq!(report.first_failing_index, None);
    }

    #[test]
    fn test_empty_chain_is_invalid() {
        let report = ChainValidator::validate(&[], DIFFICULTY);
        assert_eq!(report, ValidationReport::failed(0, ChainFault::EmptyChain));
    }

    #[test]
    fn test_tampered_transaction_reports_block() {
        let mut chain = build_chain(3);
        chain[1].transactions[0].amount = Amount::parse("999").unwrap();

        let report = ChainValidator::validate(&chain, DIFFICULTY);
        assert_eq!(report, ValidationReport::failed(1, ChainFault::HashMismatch));
    }

    #[test]
    fn test_tampered_genesis_is_detected() {
        let mut chain = build_chain(2);
        chain[0].header.created_at = at(99);

        let report = ChainValidator::validate(&chain, DIFFICULTY);
        assert_eq!(report.first_failing_index, Some(0));
    }

    #[test]
    fn test_broken_link_is_detected() {
        let mut chain = build_chain(3);
        let txs = chain[2].transactions.clone();
        chain[2] = mine(CandidateBlock::with_timestamp(2, Hash([7u8; 32]), txs, at(2)));

        let report = ChainValidator::validate(&chain, DIFFICULTY);
        assert_eq!(report, ValidationReport::failed(2, ChainFault::BrokenLink));
    }

    #[test]
    fn test_wrong_index_is_detected() {
        let mut chain = build_chain(2);
        let prev = chain[1].hash;
        chain.push(mine(CandidateBlock::with_timestamp(5, prev, vec![], at(3))));

        let report = ChainValidator::validate(&chain, DIFFICULTY);
        assert_eq!(
            report,
            ValidationReport::failed(2, ChainFault::IndexMismatch { expected: 2, got: 5 })
        );
    }

    #[test]
    fn test_remined_block_with_bad_transaction_is_detected() {
        let mut chain = build_chain(2);
        let mut txs = chain[1].transactions.clone();
        txs[1].amount = Amount::parse("999").unwrap();
        let prev = chain[0].hash;
        chain[1] = mine(CandidateBlock::with_timestamp(1, prev, txs, at(1)));

        let report = ChainValidator::validate(&chain, DIFFICULTY);
        assert_eq!(
            report,
            ValidationReport::failed(1, ChainFault::InvalidTransaction { position: 1 })
        );
    }

    #[test]
    fn test_transaction_sealed_twice_is_detected() {
        let mut chain = build_chain(3);
        let mut txs = chain[2].transactions.clone();
        txs.push(chain[1].transactions[0].clone());
        let prev = chain[1].hash;
        chain[2] = mine(CandidateBlock::with_timestamp(2, prev, txs, at(2)));

        let report = ChainValidator::validate(&chain, DIFFICULTY);
        assert_eq!(
            report,
            ValidationReport::failed(2, ChainFault::ReplayedTransaction { position: 2 })
        );
    }

    #[test]
    fn test_replay_within_one_block_is_detected() {
        let tx = transfer("a", "b", "1", 1);
        let block = mine(CandidateBlock::with_timestamp(
            1,
            Hash::ZERO,
            vec![tx.clone(), tx],
            at(1),
        ));

        assert_eq!(
            ChainValidator::first_replayed_transaction(&block, &HashSet::new()),
            Some(1)
        );
    }

    #[test]
    fn test_rewards_are_never_replays() {
        let reward = || Transaction::reward("miner", Amount::parse("50").unwrap());
        let block = mine(CandidateBlock::with_timestamp(
            1,
            Hash::ZERO,
            vec![reward(), reward()],
            at(1),
        ));

        assert_eq!(
            ChainValidator::first_replayed_transaction(&block, &HashSet::new()),
            None
        );
    }

    #[test]
    fn test_higher_difficulty_rejects_weak_blocks() {
        let chain = build_chain(3);
        let report = ChainValidator::validate(&chain, 64);
        assert_eq!(report, ValidationReport::failed(0, ChainFault::InsufficientWork));
    }

    #[test]
    fn test_validation_is_read_only_and_repeatable() {
        let mut chain = build_chain(3);
        chain[2].transactions[0].recipient = "mallory".into();
        let before = chain.clone();

        let first = ChainValidator::validate(&chain, DIFFICULTY);
        let second = ChainValidator::validate(&chain, DIFFICULTY);
        assert_eq!(first, second);
        assert_eq!(first.first_failing_index, Some(2));
        assert_eq!(chain, before);
    }
}
