//! Thread-safe handle around a [`Ledger`].
//!
//! Admission and sealing share one lock, so at most one nonce search runs per
//! ledger and a seal never interleaves with an admission. Validation copies the
//! chain under the lock and walks the copy after releasing it.

use crate::ledger::{AdmissionError, ImportError, Ledger, LedgerSnapshot, LedgerStats, SealError};
use sealchain_consensus::{CancelToken, ChainValidator, ValidationReport};
use sealchain_core::{Block, Transaction};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Cloneable, shared ledger handle.
#[derive(Debug, Clone)]
pub struct SharedLedger {
    inner: Arc<Mutex<Ledger>>,
}

impl SharedLedger {
    /// Wrap a ledger for sharing across threads.
    pub fn new(ledger: Ledger) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    // Ledger operations never leave partial state behind, so a guard poisoned
    // by a panicking caller still protects a consistent ledger.
    fn lock(&self) -> MutexGuard<'_, Ledger> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admit a transaction into the pending pool.
    pub fn submit_transaction(&self, tx: Transaction) -> Result<(), AdmissionError> {
        self.lock().submit_transaction(tx)
    }

    /// Seal under the lock. Concurrent seals wait for this one to finish.
    pub fn seal_block(&self) -> Result<Block, SealError> {
        self.lock().seal_block()
    }

    /// Seal under the lock, polling `cancel` once per nonce attempt.
    pub fn seal_block_with(&self, cancel: &CancelToken) -> Result<Block, SealError> {
        self.lock().seal_block_with(cancel)
    }

    /// Seal under the lock and pay the configured reward to `miner`.
    pub fn seal_block_rewarding(&self, miner: &str) -> Result<Block, SealError> {
        self.lock().seal_block_rewarding(miner)
    }

    /// Append a block mined elsewhere.
    pub fn import_block(&self, block: Block) -> Result<(), ImportError> {
        self.lock().import_block(block)
    }

    /// Validate a consistent copy of the chain.
    pub fn validate_chain(&self) -> ValidationReport {
        let (chain, difficulty) = {
            let ledger = self.lock();
            (ledger.chain(), ledger.difficulty())
        };
        ChainValidator::validate(&chain, difficulty)
    }

    /// Copy of the whole ledger state.
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.lock().snapshot()
    }

    /// Get ledger statistics.
    pub fn stats(&self) -> LedgerStats {
        self.lock().stats()
    }

    /// Number of blocks, genesis included.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Always false: the chain holds at least the genesis block.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl From<Ledger> for SharedLedger {
    fn from(ledger: Ledger) -> Self {
        Self::new(ledger)
    }
}
