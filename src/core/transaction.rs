//! Transaction handling for the ledger
//!
//! A transaction is authored by a public key and carries either a post
//! (free-form content) or a transfer (receiver and amount). It is signed
//! over its canonical bytes and identified by its signature. The claim set
//! records which nodes already processed it while it travels through gossip.

use crate::core::codec::{self, TX_SIGNING};
use crate::crypto::{self, KeyError, KeyPair};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Transaction-related errors
#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("Missing field: {0}")]
    MissingField(&'static str),
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),
    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("Crypto error: {0}")]
    Crypto(#[from] KeyError),
}

// =============================================================================
// Payload
// =============================================================================

/// What a transaction says
///
/// Flattened into the transaction object on the wire, so a post looks like
/// `{"author": .., "content": ..}` and a transfer like
/// `{"sender": .., "receiver": .., "amount": ..}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Payload {
    Transfer { receiver: String, amount: u64 },
    Post { content: String },
}

// =============================================================================
// Transaction
// =============================================================================

/// A signed transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    /// Hex public key of the author
    #[serde(alias = "sender")]
    pub author: String,
    /// Post or transfer
    #[serde(flatten)]
    pub payload: Payload,
    /// Set by the first node that accepts the transaction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    /// Hex signature over the signing bytes
    pub signature: String,
    /// Node identifiers that already processed this transaction
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub claim: BTreeSet<String>,
}

impl Transaction {
    /// Create an unsigned transaction
    pub fn new(author: impl Into<String>, payload: Payload) -> Self {
        Self {
            author: author.into(),
            payload,
            timestamp: None,
            signature: String::new(),
            claim: BTreeSet::new(),
        }
    }

    /// Create and sign a post with the given key pair
    pub fn post(key_pair: &KeyPair, content: impl Into<String>) -> Result<Self, TransactionError> {
        let mut tx = Self::new(
            key_pair.public_key_hex(),
            Payload::Post {
                content: content.into(),
            },
        );
        tx.sign(key_pair)?;
        Ok(tx)
    }

    /// Create and sign a transfer with the given key pair
    pub fn transfer(
        key_pair: &KeyPair,
        receiver: impl Into<String>,
        amount: u64,
    ) -> Result<Self, TransactionError> {
        let mut tx = Self::new(
            key_pair.public_key_hex(),
            Payload::Transfer {
                receiver: receiver.into(),
                amount,
            },
        );
        tx.sign(key_pair)?;
        Ok(tx)
    }

    /// Build a transaction from untrusted JSON
    ///
    /// Fails with `MissingField` when a required field is absent, and with
    /// `InvalidTransaction` when fields are present but malformed or empty.
    pub fn from_value(value: Value) -> Result<Self, TransactionError> {
        let object = value.as_object().ok_or_else(|| {
            TransactionError::InvalidTransaction("expected a JSON object".to_string())
        })?;

        if !object.contains_key("author") && !object.contains_key("sender") {
            return Err(TransactionError::MissingField("author"));
        }
        if !object.contains_key("signature") {
            return Err(TransactionError::MissingField("signature"));
        }
        let is_transfer = object.contains_key("receiver") || object.contains_key("amount");
        if is_transfer {
            if !object.contains_key("receiver") {
                return Err(TransactionError::MissingField("receiver"));
            }
            if !object.contains_key("amount") {
                return Err(TransactionError::MissingField("amount"));
            }
        } else if !object.contains_key("content") {
            return Err(TransactionError::MissingField("content"));
        }

        let tx: Transaction = serde_json::from_value(value)
            .map_err(|e| TransactionError::InvalidTransaction(e.to_string()))?;
        tx.validate()?;
        Ok(tx)
    }

    /// Check field contents that the type system cannot
    pub fn validate(&self) -> Result<(), TransactionError> {
        if self.author.trim().is_empty() {
            return Err(TransactionError::InvalidTransaction(
                "author is empty".to_string(),
            ));
        }
        if self.signature.trim().is_empty() {
            return Err(TransactionError::InvalidTransaction(
                "signature is empty".to_string(),
            ));
        }
        if let Payload::Transfer { receiver, .. } = &self.payload {
            if receiver.trim().is_empty() {
                return Err(TransactionError::InvalidTransaction(
                    "receiver is empty".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// The transaction's identity
    pub fn id(&self) -> &str {
        &self.signature
    }

    /// Canonical bytes covered by the signature
    pub fn signing_data(&self) -> Result<Vec<u8>, serde_json::Error> {
        codec::canonical_bytes(self, &TX_SIGNING)
    }

    /// Sign with the provided key pair
    ///
    /// The author is set to the key pair's public key first, so the result
    /// always verifies.
    pub fn sign(&mut self, key_pair: &KeyPair) -> Result<(), TransactionError> {
        self.author = key_pair.public_key_hex();
        let data = self.signing_data()?;
        self.signature = key_pair.sign(&data);
        Ok(())
    }

    /// Verify the signature against the author's public key
    pub fn verify(&self) -> Result<(), KeyError> {
        let data = self
            .signing_data()
            .map_err(|_| KeyError::SignatureInvalid)?;
        crypto::verify(&self.author, &self.signature, &data)
    }

    /// Whether the given node already processed this transaction
    pub fn is_claimed_by(&self, node_id: &str) -> bool {
        self.claim.contains(node_id)
    }
}
