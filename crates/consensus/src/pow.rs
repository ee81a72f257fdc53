//! Proof of Work (PoW) mining.
//!
//! A block is accepted when the hex rendering of its hash starts with at least
//! `difficulty` zeros. Mining is a brute-force walk over nonces starting at 0.

use sealchain_core::{Block, CandidateBlock, Hash};
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Highest meaningful difficulty: a SHA-256 hash has 64 hex digits.
pub const MAX_DIFFICULTY: u32 = sealchain_core::hash::HEX_DIGITS;

/// Errors that can occur while mining.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MiningError {
    #[error("mining cancelled after {attempts} attempts")]
    Cancelled { attempts: u64 },
}

pub type Result<T> = std::result::Result<T, MiningError>;

/// A check polled once per nonce attempt.
pub trait Cancellation {
    /// Error produced when the search is aborted.
    type Error;

    /// Return an error to stop the search after `attempts` tries.
    fn check(&self, attempts: u64) -> std::result::Result<(), Self::Error>;
}

/// A search that runs until it finds a nonce.
#[derive(Debug, Clone, Copy, Default)]
pub struct Uncancellable;

impl Cancellation for Uncancellable {
    type Error = Infallible;

    fn check(&self, _attempts: u64) -> std::result::Result<(), Infallible> {
        Ok(())
    }
}

/// Shared flag used to abort an in-progress search.
///
/// Cloning yields a handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Check whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Cancellation for CancelToken {
    type Error = MiningError;

    fn check(&self, attempts: u64) -> Result<()> {
        if self.is_cancelled() {
            return Err(MiningError::Cancelled { attempts });
        }
        Ok(())
    }
}

/// Proof of Work miner for a fixed difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Miner {
    difficulty: u32,
}

impl Miner {
    /// Create a miner. Difficulties above [`MAX_DIFFICULTY`] are clamped.
    pub fn new(difficulty: u32) -> Self {
        Self {
            difficulty: difficulty.min(MAX_DIFFICULTY),
        }
    }

    /// Get the difficulty.
    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Search for the first nonce whose hash meets the difficulty.
    ///
    /// The token is polled once per attempt.
    pub fn find_nonce<C: Cancellation>(
        &self,
        candidate: &CandidateBlock,
        cancel: &C,
    ) -> std::result::Result<(u64, Hash), C::Error> {
        debug!(
            index = candidate.header().index,
            difficulty = self.difficulty,
            transactions = candidate.transactions().len(),
            "mining started"
        );

        let mut nonce = 0u64;
        loop {
            if let Err(err) = cancel.check(nonce) {
                warn!(index = candidate.header().index, attempts = nonce, "mining cancelled");
                return Err(err);
            }

            let hash = candidate.hash_with_nonce(nonce);
            if hash.meets_difficulty(self.difficulty) {
                debug!(index = candidate.header().index, nonce, %hash, "nonce found");
                return Ok((nonce, hash));
            }
            nonce = nonce.wrapping_add(1);
        }
    }

    /// Mine the candidate into a sealed block.
    pub fn mine<C: Cancellation>(
        &self,
        candidate: CandidateBlock,
        cancel: &C,
    ) -> std::result::Result<Block, C::Error> {
        let (nonce, hash) = self.find_nonce(&candidate, cancel)?;
        Ok(candidate.seal(nonce, hash))
    }

    /// Mine without any way to stop early.
    pub fn mine_to_completion(&self, candidate: CandidateBlock) -> Block {
        match self.mine(candidate, &Uncancellable) {
            Ok(block) => block,
            Err(never) => match never {},
        }
    }

    /// Check a claimed hash against the block's stored state.
    ///
    /// True iff the claim meets the difficulty and equals the hash recomputed
    /// from the block's current fields and stored nonce. The block is only read.
    pub fn is_valid_proof(&self, block: &Block, claimed_hash: &Hash) -> bool {
        claimed_hash.meets_difficulty(self.difficulty) && *claimed_hash == block.compute_hash()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sealchain_core::{Amount, Transaction};

    fn candidate() -> CandidateBlock {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let tx = Transaction::with_timestamp("Satoshi", "Mike", Amount::parse("5").unwrap(), at)
            .signed()
            .unwrap();
        CandidateBlock::with_timestamp(1, Hash::ZERO, vec![tx], at)
    }

    #[test]
    fn test_mined_hash_meets_difficulty() {
        let miner = Miner::new(2);
        let block = miner.mine(candidate(), &CancelToken::new()).unwrap();

        assert!(block.hash.to_hex().starts_with("00"));
        assert_eq!(block.compute_hash(), block.hash);
        assert!(miner.is_valid_proof(&block, &block.hash));
    }

    #[test]
    fn test_mining_is_deterministic() {
        let miner = Miner::new(2);
        let c = candidate();
        let first = miner.find_nonce(&c, &CancelToken::new()).unwrap();
        let second = miner.find_nonce(&c, &CancelToken::new()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_nonce_is_first_solution() {
        let miner = Miner::new(1);
        let c = candidate();
        let (nonce, _) = miner.find_nonce(&c, &CancelToken::new()).unwrap();
        for earlier in 0..nonce {
            assert!(!c.hash_with_nonce(earlier).meets_difficulty(1));
        }
    }

    #[test]
    fn test_difficulty_zero_accepts_first_nonce() {
        let (nonce, _) = Miner::new(0).find_nonce(&candidate(), &CancelToken::new()).unwrap();
        assert_eq!(nonce, 0);
    }

    #[test]
    fn test_cancelled_mining_stops_before_first_attempt() {
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = Miner::new(4).mine(candidate(), &cancel).unwrap_err();
        assert_eq!(err, MiningError::Cancelled { attempts: 0 });
    }

    #[test]
    fn test_cancel_from_another_thread() {
        let cancel = CancelToken::new();
        let handle = {
            let cancel = cancel.clone();
            // 16 leading zeros is far beyond what a test run could find.
            std::thread::spawn(move || Miner::new(16).mine(candidate(), &cancel))
        };

        std::thread::sleep(std::time::Duration::from_millis(20));
        cancel.cancel();

        let result = handle.join().unwrap();
        assert!(matches!(result, Err(MiningError::Cancelled { .. })));
    }

    #[test]
    fn test_mine_to_completion() {
        let miner = Miner::new(1);
        let block = miner.mine_to_completion(candidate());
        assert!(miner.is_valid_proof(&block, &block.hash));
    }

    #[test]
    fn test_cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn test_is_valid_proof_does_not_mutate() {
        let miner = Miner::new(1);
        let block = miner.mine(candidate(), &CancelToken::new()).unwrap();
        let before = block.clone();

        assert!(miner.is_valid_proof(&block, &block.hash));
        assert!(miner.is_valid_proof(&block, &block.hash));
        assert_eq!(block, before);
        assert_eq!(block.compute_hash(), block.compute_hash());
    }

    #[test]
    fn test_is_valid_proof_rejects_wrong_claims() {
        let miner = Miner::new(1);
        let mut block = miner.mine(candidate(), &CancelToken::new()).unwrap();

        // A zero hash meets any difficulty but is not the block's hash.
        assert!(!miner.is_valid_proof(&block, &Hash::ZERO));

        block.transactions[0].amount = Amount::parse("999").unwrap();
        let claimed = block.hash;
        assert!(!miner.is_valid_proof(&block, &claimed));
    }

    #[test]
    fn test_is_valid_proof_requires_difficulty() {
        let block = Miner::new(0).mine(candidate(), &CancelToken::new()).unwrap();
        if !block.hash.meets_difficulty(3) {
            assert!(!Miner::new(3).is_valid_proof(&block, &block.hash));
        }
        assert!(Miner::new(0).is_valid_proof(&block, &block.hash));
    }

    #[test]
    fn test_difficulty_is_clamped() {
        assert_eq!(Miner::new(1000).difficulty(), MAX_DIFFICULTY);
    }
}
