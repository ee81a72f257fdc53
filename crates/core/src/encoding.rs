//! Canonical, boundary-safe encoding of ledger entities.
//!
//! Every hashed entity is written as a domain string followed by its fields in
//! a fixed order. Each field is framed as `tag | len (u64 LE) | bytes`, so two
//! different field tuples can never produce the same byte sequence: the
//! split `("ab", "c")` encodes differently from `("a", "bc")`.

use crate::hash::{hash, Hash};
use chrono::{DateTime, Utc};

/// Field type tags.
mod tag {
    pub const STR: u8 = 0x01;
    pub const U64: u8 = 0x02;
    pub const I64: u8 = 0x03;
    pub const TIME: u8 = 0x04;
    pub const HASH: u8 = 0x05;
    pub const LIST: u8 = 0x06;
    pub const RECORD: u8 = 0x07;
}

/// Builder for the canonical byte representation of one record.
#[derive(Debug, Clone)]
pub struct CanonicalEncoder {
    buf: Vec<u8>,
}

impl CanonicalEncoder {
    /// Start a record under the given domain, e.g. `"sealchain/tx/v1"`.
    pub fn new(domain: &str) -> Self {
        let mut encoder = Self { buf: Vec::with_capacity(128) };
        encoder.frame(tag::STR, domain.as_bytes());
        encoder
    }

    fn frame(&mut self, tag: u8, bytes: &[u8]) {
        self.buf.push(tag);
        self.buf.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
        self.buf.extend_from_slice(bytes);
    }

    /// Append a UTF-8 string field.
    pub fn str(mut self, value: &str) -> Self {
        self.frame(tag::STR, value.as_bytes());
        self
    }

    /// Append an unsigned integer field.
    pub fn u64(mut self, value: u64) -> Self {
        self.frame(tag::U64, &value.to_le_bytes());
        self
    }

    /// Append a signed integer field.
    pub fn i64(mut self, value: i64) -> Self {
        self.frame(tag::I64, &value.to_le_bytes());
        self
    }

    /// Append a timestamp as whole seconds plus sub-second nanoseconds.
    pub fn timestamp(mut self, value: &DateTime<Utc>) -> Self {
        let mut bytes = [0u8; 12];
        bytes[..8].copy_from_slice(&value.timestamp().to_le_bytes());
        bytes[8..].copy_from_slice(&value.timestamp_subsec_nanos().to_le_bytes());
        self.frame(tag::TIME, &bytes);
        self
    }

    /// Append a hash field.
    pub fn hash(mut self, value: &Hash) -> Self {
        self.frame(tag::HASH, value.as_bytes());
        self
    }

    /// Append a list of nested records, prefixed by its element count.
    pub fn records<'a, I>(mut self, items: I) -> Self
    where
        I: ExactSizeIterator<Item = &'a [u8]>,
    {
        self.frame(tag::LIST, &(items.len() as u64).to_le_bytes());
        for item in items {
            self.frame(tag::RECORD, item);
        }
        self
    }

    /// Finish and return the encoded bytes.
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    /// Finish and hash the encoded bytes with SHA-256.
    pub fn digest(self) -> Hash {
        hash(&self.buf)
    }
}
