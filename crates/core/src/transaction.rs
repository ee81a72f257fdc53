//! Transaction types and integrity tokens.
//!
//! The integrity token is a hash-based stand-in for a signature: it binds the
//! transaction's fields so that any later mutation is detectable.

use crate::amount::Amount;
use crate::encoding::CanonicalEncoder;
use crate::hash::Hash;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const TX_DOMAIN: &str = "sealchain/tx/v1";

/// Errors that can occur during transaction operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    #[error("transaction already carries a different integrity token")]
    AlreadySigned,
}

/// A transfer of value between two parties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Sender name (empty for a mining reward).
    pub sender: String,
    /// Recipient name.
    pub recipient: String,
    /// Value to transfer.
    pub amount: Amount,
    /// Creation time, read once when the transaction is built.
    pub created_at: DateTime<Utc>,
    /// Integrity token (None until signed).
    pub integrity_token: Option<Hash>,
}

impl Transaction {
    /// Create a new unsigned transaction stamped with the current time.
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>, amount: Amount) -> Self {
        Self::with_timestamp(sender, recipient, amount, Utc::now())
    }

    /// Create a new unsigned transaction with an explicit creation time.
    pub fn with_timestamp(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: Amount,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
            created_at,
            integrity_token: None,
        }
    }

    /// Create a mining reward transaction (no sender, never signed).
    pub fn reward(recipient: impl Into<String>, amount: Amount) -> Self {
        Self::new(String::new(), recipient, amount)
    }

    /// Check if this is a mining reward.
    pub fn is_reward(&self) -> bool {
        self.sender.is_empty()
    }

    /// Check if an integrity token is attached.
    pub fn is_signed(&self) -> bool {
        self.integrity_token.is_some()
    }

    /// Hash of the signed fields: sender, recipient, amount and creation time.
    pub fn signing_hash(&self) -> Hash {
        CanonicalEncoder::new(TX_DOMAIN)
            .str(&self.sender)
            .str(&self.recipient)
            .i64(self.amount.units())
            .timestamp(&self.created_at)
            .digest()
    }

    /// Canonical bytes of the whole transaction, token included.
    ///
    /// This is what a block commits to.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let token = self.integrity_token.unwrap_or(Hash::ZERO);
        CanonicalEncoder::new(TX_DOMAIN)
            .str(&self.sender)
            .str(&self.recipient)
            .i64(self.amount.units())
            .timestamp(&self.created_at)
            .u64(self.integrity_token.is_some() as u64)
            .hash(&token)
            .finish()
    }

    /// Compute and store the integrity token.
    ///
    /// Signing twice is a no-op while the fields are unchanged. Once a signed
    /// transaction has been mutated it can no longer be re-signed.
    pub fn sign(&mut self) -> Result<Hash, TransactionError> {
        let token = self.signing_hash();
        match self.integrity_token {
            None => {
                self.integrity_token = Some(token);
                Ok(token)
            }
            Some(existing) if existing == token => Ok(existing),
            Some(_) => Err(TransactionError::AlreadySigned),
        }
    }

    /// Create a signed transaction.
    pub fn signed(mut self) -> Result<Self, TransactionError> {
        self.sign()?;
        Ok(self)
    }

    /// Check the integrity token against the current fields.
    ///
    /// Rewards are always valid; anything else needs a matching token.
    pub fn is_valid(&self) -> bool {
        if self.is_reward() {
            return true;
        }
        match self.integrity_token {
            Some(token) => token == self.signing_hash(),
            None => false,
        }
    }
}
