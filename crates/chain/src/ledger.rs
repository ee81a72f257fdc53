//! Main ledger orchestration.
//!
//! The ledger owns the chain and the pending pool. It admits transactions,
//! seals the pool into mined blocks and validates the whole chain.

use crate::config::LedgerConfig;
use crate::mempool::{Mempool, MempoolError};
use sealchain_consensus::{
    CancelToken, Cancellation, ChainFault, ChainValidator, Miner, MiningError, Uncancellable,
    ValidationReport, MAX_DIFFICULTY,
};
use sealchain_core::{Block, CandidateBlock, Hash, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::convert::Infallible;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Reasons a transaction is refused entry to the pending pool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error("transaction has no sender")]
    EmptySender,

    #[error("transaction has no recipient")]
    EmptyRecipient,

    #[error("transaction integrity token is missing or does not match")]
    InvalidSignature,

    #[error("transaction amount is negative")]
    NegativeAmount,

    #[error("transaction is already sealed in the chain")]
    AlreadySealed,

    #[error("mempool error: {0}")]
    Pool(#[from] MempoolError),
}

/// Reasons a seal did not produce a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SealError {
    #[error("no pending transactions to seal")]
    EmptyPool,

    #[error("mining was cancelled")]
    Cancelled,
}

impl From<MiningError> for SealError {
    fn from(_: MiningError) -> Self {
        SealError::Cancelled
    }
}

impl From<Infallible> for SealError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

/// Reasons a block or snapshot produced elsewhere is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error("block {index} rejected: {fault}")]
    Rejected { index: u64, fault: ChainFault },

    #[error("pending transaction rejected: {0}")]
    Pending(#[from] AdmissionError),
}

/// Copy of the ledger state, detached from the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Difficulty the chain was mined at.
    pub difficulty: u32,
    /// Sealed blocks, genesis first.
    pub chain: Vec<Block>,
    /// Transactions waiting to be sealed.
    pub pending: Vec<Transaction>,
}

impl LedgerSnapshot {
    /// Validate the copied chain at its recorded difficulty.
    pub fn validate(&self) -> ValidationReport {
        ChainValidator::validate(&self.chain, self.difficulty)
    }

    /// Render as indented JSON.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Parse a snapshot written by [`LedgerSnapshot::to_json_pretty`].
    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}

/// Ledger statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerStats {
    /// Index of the latest block.
    pub height: u64,
    /// Hash of the latest block.
    pub latest_block_hash: Hash,
    /// Number of pending transactions.
    pub pending_transactions: usize,
    /// Transactions sealed across all blocks.
    pub sealed_transactions: usize,
    /// Difficulty in leading hex zeros.
    pub difficulty: u32,
}

/// Single-node ledger: an append-only chain of mined blocks plus a pending pool.
#[derive(Debug, Clone)]
pub struct Ledger {
    /// Sealed blocks; never empty, genesis first.
    chain: Vec<Block>,
    /// Admitted, not yet sealed transactions.
    pending: Mempool,
    /// Integrity tokens of every sealed transaction.
    sealed: HashSet<Hash>,
    /// Nonce search at this ledger's difficulty.
    miner: Miner,
    /// Configuration.
    config: LedgerConfig,
}

impl Ledger {
    /// Create a ledger at `difficulty` and mine its genesis block.
    pub fn new(difficulty: u32) -> Self {
        Self::with_config(LedgerConfig::with_difficulty(difficulty))
    }

    /// Create a ledger from a configuration and mine its genesis block.
    ///
    /// Values the ledger cannot use are adjusted with a warning: difficulty
    /// above [`MAX_DIFFICULTY`] is clamped, a zero `max_pending` becomes 1 and
    /// a negative mining reward is dropped.
    pub fn with_config(config: LedgerConfig) -> Self {
        let config = Self::sanitize(config);
        let miner = Miner::new(config.difficulty);
        let genesis = miner.mine_to_completion(CandidateBlock::genesis());
        info!(nonce = genesis.nonce(), hash = %genesis.hash, "genesis block mined");

        Self::from_genesis(genesis, miner, config)
    }

    /// Rebuild a ledger from a snapshot without mining anything.
    ///
    /// Genesis is checked in place, every later block goes through
    /// [`Ledger::import_block`] and the pending transactions are re-admitted.
    /// The snapshot's difficulty replaces the one in `config`.
    pub fn from_snapshot(
        snapshot: LedgerSnapshot,
        config: LedgerConfig,
    ) -> Result<Self, ImportError> {
        let config = Self::sanitize(LedgerConfig {
            difficulty: snapshot.difficulty,
            ..config
        });
        let miner = Miner::new(config.difficulty);

        let mut blocks = snapshot.chain.into_iter();
        let genesis = blocks.next().ok_or(ImportError::Rejected {
            index: 0,
            fault: ChainFault::EmptyChain,
        })?;
        Self::check_block(&genesis, 0, &Hash::GENESIS_PARENT, &miner, &HashSet::new())?;

        let mut ledger = Self::from_genesis(genesis, miner, config);
        for block in blocks {
            ledger.import_block(block)?;
        }
        for tx in snapshot.pending {
            ledger.submit_transaction(tx)?;
        }

        info!(
            height = ledger.tip().index(),
            pending = ledger.pending.len(),
            "ledger restored from snapshot"
        );
        Ok(ledger)
    }

    fn from_genesis(genesis: Block, miner: Miner, config: LedgerConfig) -> Self {
        let mut ledger = Self {
            chain: Vec::new(),
            pending: Mempool::with_capacity(config.max_pending),
            sealed: HashSet::new(),
            miner,
            config,
        };
        ledger.append(genesis);
        ledger
    }

    fn sanitize(mut config: LedgerConfig) -> LedgerConfig {
        if config.difficulty > MAX_DIFFICULTY {
            warn!(
                requested = config.difficulty,
                max = MAX_DIFFICULTY,
                "difficulty clamped"
            );
            config.difficulty = MAX_DIFFICULTY;
        }
        if config.max_pending == 0 {
            warn!(requested = 0, used = 1, "max_pending raised");
            config.max_pending = 1;
        }
        if let Some(reward) = config.mining_reward.filter(|reward| reward.is_negative()) {
            warn!(%reward, "negative mining reward ignored");
            config.mining_reward = None;
        }
        config
    }

    /// Get the configuration.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Get the difficulty.
    pub fn difficulty(&self) -> u32 {
        self.miner.difficulty()
    }

    /// Number of blocks, genesis included.
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Always false: the chain holds at least the genesis block.
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Number of pending transactions.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn tip(&self) -> &Block {
        // Construction always pushes genesis and the chain never shrinks.
        &self.chain[self.chain.len() - 1]
    }

    /// Copy of the latest block.
    pub fn last_block(&self) -> Block {
        self.tip().clone()
    }

    /// Copy of the block at `index`.
    pub fn block(&self, index: u64) -> Option<Block> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.chain.get(i))
            .cloned()
    }

    /// Copy of every sealed block.
    pub fn chain(&self) -> Vec<Block> {
        self.chain.clone()
    }

    /// Copy of the pending transactions in admission order.
    pub fn pending(&self) -> Vec<Transaction> {
        self.pending.get_all()
    }

    /// Copy of the whole ledger state.
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            difficulty: self.difficulty(),
            chain: self.chain(),
            pending: self.pending(),
        }
    }

    /// Check a transaction against the admission rules without pooling it.
    pub fn check_admission(tx: &Transaction) -> Result<(), AdmissionError> {
        if tx.sender.is_empty() {
            return Err(AdmissionError::EmptySender);
        }
        if tx.recipient.is_empty() {
            return Err(AdmissionError::EmptyRecipient);
        }
        if !tx.is_valid() {
            return Err(AdmissionError::InvalidSignature);
        }
        if tx.amount.is_negative() {
            return Err(AdmissionError::NegativeAmount);
        }
        Ok(())
    }

    fn check_unsealed(&self, tx: &Transaction) -> Result<(), AdmissionError> {
        match tx.integrity_token {
            Some(token) if self.sealed.contains(&token) => Err(AdmissionError::AlreadySealed),
            _ => Ok(()),
        }
    }

    /// Validate a transaction and append it to the pending pool.
    ///
    /// A transaction already sealed into the chain is refused.
    pub fn submit_transaction(&mut self, tx: Transaction) -> Result<(), AdmissionError> {
        let checked = Self::check_admission(&tx).and_then(|()| self.check_unsealed(&tx));
        if let Err(err) = checked {
            warn!(sender = %tx.sender, recipient = %tx.recipient, %err, "transaction rejected");
            return Err(err);
        }

        debug!(
            sender = %tx.sender,
            recipient = %tx.recipient,
            amount = %tx.amount,
            "transaction passed admission checks"
        );
        self.pending.add(tx).map_err(|err| {
            warn!(%err, "transaction rejected by mempool");
            AdmissionError::from(err)
        })
    }

    /// Seal all pending transactions into a new mined block.
    pub fn seal_block(&mut self) -> Result<Block, SealError> {
        self.seal(None, &Uncancellable)
    }

    /// Seal, polling `cancel` once per nonce attempt.
    ///
    /// On cancellation the chain and the pending pool are left as they were.
    pub fn seal_block_with(&mut self, cancel: &CancelToken) -> Result<Block, SealError> {
        self.seal(None, cancel)
    }

    /// Seal and pay the configured mining reward to `miner`.
    ///
    /// The reward transaction is placed first in the block. Without a
    /// configured reward this is the same as [`Ledger::seal_block`].
    pub fn seal_block_rewarding(&mut self, miner: &str) -> Result<Block, SealError> {
        self.seal(Some(miner), &Uncancellable)
    }

    fn seal<C>(&mut self, reward_to: Option<&str>, cancel: &C) -> Result<Block, SealError>
    where
        C: Cancellation,
        SealError: From<C::Error>,
    {
        if self.pending.is_empty() {
            return Err(SealError::EmptyPool);
        }

        let mut transactions = Vec::with_capacity(self.pending.len() + 1);
        if let (Some(recipient), Some(amount)) = (reward_to, self.config.mining_reward) {
            transactions.push(Transaction::reward(recipient, amount));
        }
        transactions.extend_from_slice(self.pending.transactions());

        let tip = self.tip();
        let candidate = CandidateBlock::new(tip.index() + 1, tip.hash, transactions);

        // The pool is only cleared once a block has actually been appended.
        let block = self.miner.mine(candidate, cancel)?;
        self.append(block.clone());
        self.pending.clear();

        info!(
            index = block.index(),
            nonce = block.nonce(),
            hash = %block.hash,
            transactions = block.tx_count(),
            "block sealed"
        );
        Ok(block)
    }

    /// Append a block mined elsewhere on top of the current tip.
    ///
    /// The block must carry the next index, link to the tip, hold a valid
    /// proof and contain only valid transactions that were never sealed
    /// before. Pooled copies of its transactions are dropped. On rejection
    /// the chain and the pool are left as they were.
    pub fn import_block(&mut self, block: Block) -> Result<(), ImportError> {
        let tip = self.tip();
        let index = tip.index() + 1;
        if let Err(err) = Self::check_block(&block, index, &tip.hash, &self.miner, &self.sealed) {
            warn!(index, %err, "block import rejected");
            return Err(err);
        }

        let tokens: Vec<Hash> = block.tokens().collect();
        self.pending.remove_batch(&tokens);
        self.append(block);

        let block = self.tip();
        info!(
            index = block.index(),
            nonce = block.nonce(),
            hash = %block.hash,
            transactions = block.tx_count(),
            "block imported"
        );
        Ok(())
    }

    fn check_block(
        block: &Block,
        index: u64,
        previous: &Hash,
        miner: &Miner,
        sealed: &HashSet<Hash>,
    ) -> Result<(), ImportError> {
        ChainValidator::validate_block(block, index, previous, miner)
            .and_then(|()| match ChainValidator::first_replayed_transaction(block, sealed) {
                Some(position) => Err(ChainFault::ReplayedTransaction { position }),
                None => Ok(()),
            })
            .map_err(|fault| ImportError::Rejected { index, fault })
    }

    fn append(&mut self, block: Block) {
        self.sealed.extend(block.tokens());
        self.chain.push(block);
    }

    /// Check a claimed hash against a block, without modifying it.
    pub fn is_valid_proof(&self, block: &Block, claimed_hash: &Hash) -> bool {
        self.miner.is_valid_proof(block, claimed_hash)
    }

    /// Validate the whole chain from genesis. Read-only.
    pub fn validate_chain(&self) -> ValidationReport {
        ChainValidator::validate(&self.chain, self.difficulty())
    }

    /// Get ledger statistics.
    pub fn stats(&self) -> LedgerStats {
        let tip = self.tip();
        LedgerStats {
            height: tip.index(),
            latest_block_hash: tip.hash,
            pending_transactions: self.pending.len(),
            sealed_transactions: self.chain.iter().map(Block::tx_count).sum(),
            difficulty: self.difficulty(),
        }
    }
}
