//! Block and block header structures.

use crate::encoding::CanonicalEncoder;
use crate::hash::Hash;
use crate::transaction::Transaction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const BLOCK_DOMAIN: &str = "sealchain/block/v1";

/// The hashed metadata of a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Position in the chain (0 for genesis).
    pub index: u64,
    /// Proof-of-work nonce.
    pub nonce: u64,
    /// Hash of the previous block.
    pub previous_hash: Hash,
    /// Creation time, read once when the candidate is built.
    pub created_at: DateTime<Utc>,
}

/// Hash a header with the given nonce over an already encoded transaction list.
fn hash_parts(header: &BlockHeader, nonce: u64, transactions: &[Vec<u8>]) -> Hash {
    CanonicalEncoder::new(BLOCK_DOMAIN)
        .u64(header.index)
        .u64(nonce)
        .hash(&header.previous_hash)
        .timestamp(&header.created_at)
        .records(transactions.iter().map(Vec::as_slice))
        .digest()
}

fn encode_transactions(transactions: &[Transaction]) -> Vec<Vec<u8>> {
    transactions.iter().map(Transaction::canonical_bytes).collect()
}

/// A block that has not been mined yet.
///
/// The transaction list is encoded once up front so that trying a nonce only
/// re-hashes the framing around it.
#[derive(Debug, Clone)]
pub struct CandidateBlock {
    header: BlockHeader,
    transactions: Vec<Transaction>,
    encoded_transactions: Vec<Vec<u8>>,
}

impl CandidateBlock {
    /// Create a candidate stamped with the current time.
    pub fn new(index: u64, previous_hash: Hash, transactions: Vec<Transaction>) -> Self {
        Self::with_timestamp(index, previous_hash, transactions, Utc::now())
    }

    /// Create a candidate with an explicit creation time.
    pub fn with_timestamp(
        index: u64,
        previous_hash: Hash,
        transactions: Vec<Transaction>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let encoded_transactions = encode_transactions(&transactions);
        Self {
            header: BlockHeader {
                index,
                nonce: 0,
                previous_hash,
                created_at,
            },
            transactions,
            encoded_transactions,
        }
    }

    /// Create the genesis candidate.
    pub fn genesis() -> Self {
        Self::new(0, Hash::GENESIS_PARENT, Vec::new())
    }

    /// Header the nonce search works on.
    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    /// Transactions committed to by the candidate.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Hash the candidate as if it carried `nonce`.
    pub fn hash_with_nonce(&self, nonce: u64) -> Hash {
        hash_parts(&self.header, nonce, &self.encoded_transactions)
    }

    /// Fix the nonce and hash, producing an immutable block.
    ///
    /// The caller is responsible for `hash` matching `hash_with_nonce(nonce)`;
    /// a mismatch is caught by chain validation.
    pub fn seal(self, nonce: u64, hash: Hash) -> Block {
        Block {
            header: BlockHeader { nonce, ..self.header },
            hash,
            transactions: self.transactions,
        }
    }

}

/// A mined block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Block header.
    pub header: BlockHeader,
    /// Hash fixed at sealing time.
    pub hash: Hash,
    /// List of transactions in this block.
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Recompute the hash from the stored fields. Never touches `self.hash`.
    pub fn compute_hash(&self) -> Hash {
        let encoded = encode_transactions(&self.transactions);
        hash_parts(&self.header, self.header.nonce, &encoded)
    }

    /// Check that every contained transaction is valid (vacuously true when empty).
    pub fn has_valid_transactions(&self) -> bool {
        self.transactions.iter().all(Transaction::is_valid)
    }

    /// Position of the first invalid transaction, if any.
    pub fn first_invalid_transaction(&self) -> Option<usize> {
        self.transactions.iter().position(|tx| !tx.is_valid())
    }

    /// Integrity tokens of the signed transactions, in block order.
    pub fn tokens(&self) -> impl Iterator<Item = Hash> + '_ {
        self.transactions.iter().filter_map(|tx| tx.integrity_token)
    }

    /// Get the block index.
    pub fn index(&self) -> u64 {
        self.header.index
    }

    /// Get the proof-of-work nonce.
    pub fn nonce(&self) -> u64 {
        self.header.nonce
    }

    /// Get the previous block's hash.
    pub fn previous_hash(&self) -> Hash {
        self.header.previous_hash
    }

    /// Check if this is the genesis block.
    pub fn is_genesis(&self) -> bool {
        self.header.index == 0 && self.header.previous_hash == Hash::GENESIS_PARENT
    }

    /// Get the number of transactions in this block.
    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }
}
