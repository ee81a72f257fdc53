//! Pending transaction pool.
//!
//! The pool stores admitted transactions waiting to be sealed into a block.
//! Order of admission is order of inclusion; there is no fee prioritization.

use sealchain_core::{Hash, Transaction};
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during mempool operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MempoolError {
    #[error("transaction already in mempool")]
    DuplicateTransaction,

    #[error("mempool is full (capacity: {0})")]
    MempoolFull(usize),
}

pub type Result<T> = std::result::Result<T, MempoolError>;

/// Default pool capacity.
pub const DEFAULT_MAX_PENDING: usize = 10_000;

/// Transaction mempool.
#[derive(Debug, Clone)]
pub struct Mempool {
    /// Maximum number of transactions held at once.
    capacity: usize,
    /// Transactions in admission order.
    transactions: Vec<Transaction>,
    /// Integrity tokens of pooled transactions, for duplicate detection.
    tokens: HashSet<Hash>,
}

impl Mempool {
    /// Create a new mempool with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_PENDING)
    }

    /// Create a new mempool holding at most `capacity` transactions.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            transactions: Vec::new(),
            tokens: HashSet::new(),
        }
    }

    /// Get the number of transactions in the mempool.
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Check if the mempool is empty.
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Check if a transaction with this integrity token is pooled.
    pub fn contains(&self, token: &Hash) -> bool {
        self.tokens.contains(token)
    }

    /// Append a transaction to the back of the pool.
    pub fn add(&mut self, tx: Transaction) -> Result<()> {
        if let Some(token) = tx.integrity_token {
            if self.contains(&token) {
                return Err(MempoolError::DuplicateTransaction);
            }
        }

        if self.transactions.len() >= self.capacity {
            return Err(MempoolError::MempoolFull(self.capacity));
        }

        if let Some(token) = tx.integrity_token {
            self.tokens.insert(token);
        }
        self.transactions.push(tx);

        Ok(())
    }

    /// Borrow the pooled transactions in admission order.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Copy out all pooled transactions in admission order.
    pub fn get_all(&self) -> Vec<Transaction> {
        self.transactions.clone()
    }

    /// Remove pooled transactions whose integrity token is in `tokens`.
    pub fn remove_batch(&mut self, tokens: &[Hash]) {
        for token in tokens {
            self.tokens.remove(token);
        }
        let remaining = &self.tokens;
        self.transactions
            .retain(|tx| tx.integrity_token.map_or(true, |token| remaining.contains(&token)));
    }

    /// Clear all transactions from the mempool.
    pub fn clear(&mut self) {
        self.transactions.clear();
        self.tokens.clear();
    }
}

impl Default for Mempool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealchain_core::Amount;

    fn transfer(sender: &str, amount: &str) -> Transaction {
        Transaction::new(sender, "bob", Amount::parse(amount).unwrap())
            .signed()
            .unwrap()
    }

    #[test]
    fn test_mempool_add_and_contains() {
        let mut mempool = Mempool::new();
        let tx = transfer("alice", "1");
        let token = tx.integrity_token.unwrap();

        assert!(mempool.add(tx.clone()).is_ok());
        assert_eq!(mempool.len(), 1);
        assert!(mempool.contains(&token));
        assert_eq!(mempool.transactions(), &[tx]);
    }

    #[test]
    fn test_mempool_preserves_order() {
        let mut mempool = Mempool::new();
        let txs: Vec<_> = ["3", "1", "2"].iter().map(|a| transfer("alice", a)).collect();
        for tx in &txs {
            mempool.add(tx.clone()).unwrap();
        }
        assert_eq!(mempool.get_all(), txs);
    }

    #[test]
    fn test_mempool_duplicate_rejected() {
        let mut mempool = Mempool::new();
        let tx = transfer("alice", "1");

        assert!(mempool.add(tx.clone()).is_ok());
        assert_eq!(mempool.add(tx), Err(MempoolError::DuplicateTransaction));
        assert_eq!(mempool.len(), 1);
    }

    #[test]
    fn test_mempool_capacity_limit() {
        let mut mempool = Mempool::with_capacity(2);

        assert!(mempool.add(transfer("a", "1")).is_ok());
        assert!(mempool.add(transfer("b", "2")).is_ok());
        assert_eq!(
            mempool.add(transfer("c", "3")),
            Err(MempoolError::MempoolFull(2))
        );
        assert_eq!(mempool.len(), 2);
    }

    #[test]
    fn test_mempool_remove_batch() {
        let mut mempool = Mempool::new();
        let txs: Vec<_> = ["1", "2", "3"].iter().map(|a| transfer("alice", a)).collect();
        for tx in &txs {
            mempool.add(tx.clone()).unwrap();
        }

        let gone = txs[1].integrity_token.unwrap();
        mempool.remove_batch(&[gone]);

        assert_eq!(mempool.get_all(), vec![txs[0].clone(), txs[2].clone()]);
        assert!(!mempool.contains(&gone));
        assert!(mempool.add(txs[1].clone()).is_ok());
    }

    #[test]
    fn test_mempool_clear() {
        let mut mempool = Mempool::new();
        let tx = transfer("alice", "1");
        let token = tx.integrity_token.unwrap();
        mempool.add(tx.clone()).unwrap();

        mempool.clear();
        assert!(mempool.is_empty());
        assert!(!mempool.contains(&token));
        assert!(mempool.add(tx).is_ok());
    }
}
