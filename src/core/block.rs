//! Block implementation for the ledger
//!
//! A block batches transactions and links to its predecessor by hash. The
//! stored `hash` is derived: it is the SHA-256 of the block's canonical
//! bytes with the `hash` field itself left out.

use crate::core::codec::{self, BLOCK_HASH};
use crate::core::transaction::Transaction;
use crate::crypto::{meets_difficulty, sha256_hex};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Previous-hash marker carried by the genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// A block in the chain
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Block {
    /// Block index/height
    pub index: u64,
    /// Transactions in the block, in mempool order
    pub transactions: Vec<Transaction>,
    /// Creation time (unix seconds)
    pub timestamp: i64,
    /// Hash of the previous block
    pub previous_hash: String,
    /// Nonce used for proof of work
    pub nonce: u64,
    /// Block hash (derived, not part of the hash input)
    #[serde(default)]
    pub hash: String,
}

impl Block {
    /// Create a new block (unmined)
    pub fn new(index: u64, transactions: Vec<Transaction>, previous_hash: String) -> Self {
        Self {
            index,
            transactions,
            timestamp: Utc::now().timestamp(),
            previous_hash,
            nonce: 0,
            hash: String::new(),
        }
    }

    /// Create the genesis block (unmined)
    pub fn genesis() -> Self {
        Self::new(0, Vec::new(), GENESIS_PREVIOUS_HASH.to_string())
    }

    /// Recompute the hash from the block's content
    ///
    /// The stored `hash` field is ignored, so this can be compared against it.
    pub fn compute_hash(&self) -> Result<String, serde_json::Error> {
        let bytes = codec::canonical_bytes(self, &BLOCK_HASH)?;
        Ok(sha256_hex(&bytes))
    }

    /// Mine the block (find a valid nonce)
    ///
    /// Starts at nonce 0 and walks upward until the hash carries `difficulty`
    /// leading zeros. Sets `nonce` and `hash`; returns the number of attempts.
    pub fn mine(&mut self, difficulty: usize) -> Result<u64, serde_json::Error> {
        self.nonce = 0;
        let mut attempts = 1u64;

        loop {
            let hash = self.compute_hash()?;
            if meets_difficulty(&hash, difficulty) {
                self.hash = hash;
                return Ok(attempts);
            }
            self.nonce += 1;
            attempts += 1;
        }
    }

    /// Check the stored hash against the content and the difficulty target
    pub fn has_valid_hash(&self, difficulty: usize) -> bool {
        meets_difficulty(&self.hash, difficulty)
            && self.compute_hash().map(|h| h == self.hash).unwrap_or(false)
    }

    /// Whether the block has the genesis shape
    pub fn is_genesis(&self) -> bool {
        self.index == 0 && self.previous_hash == GENESIS_PREVIOUS_HASH
    }

    /// Get number of transactions in this block
    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }

    /// Whether the block carries a transaction with this signature
    pub fn contains_transaction(&self, signature: &str) -> bool {
        self.transactions.iter().any(|tx| tx.signature == signature)
    }
}
