//! Transaction pool (mempool) for pending transactions
//!
//! Holds authenticated transactions waiting to be mined, in arrival order.
//! A transaction is identified by its signature: once a signature has been
//! claimed here it is never admitted again, and a transaction whose claim set
//! already names this node is treated as a gossip loop.

use crate::core::{Block, Transaction};
use crate::crypto::KeyError;
use chrono::Utc;
use std::collections::HashSet;
use thiserror::Error;

/// Mempool errors
#[derive(Error, Debug)]
pub enum MempoolError {
    #[error("Transaction already seen")]
    AlreadySeen,
    #[error("Authentication failed: {0}")]
    Authentication(#[from] KeyError),
}

/// Memory pool for pending transactions
#[derive(Debug, Default)]
pub struct TransactionPool {
    /// Pending transactions in arrival order
    pending: Vec<Transaction>,
    /// Signatures of every transaction ever admitted or mined
    claimed: HashSet<String>,
    /// Signatures known to be in a block, local or remote
    mined: HashSet<String>,
}

impl TransactionPool {
    /// Create a new mempool
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a transaction
    ///
    /// Rejects duplicates and loop-backs, then authenticates. Only an
    /// authenticated transaction claims its signature, gets this node added
    /// to its claim set and is stamped. Returns the admitted copy.
    pub fn submit(
        &mut self,
        mut tx: Transaction,
        node_id: &str,
    ) -> Result<&Transaction, MempoolError> {
        if self.claimed.contains(&tx.signature) || tx.is_claimed_by(node_id) {
            return Err(MempoolError::AlreadySeen);
        }

        tx.verify()?;

        self.claimed.insert(tx.signature.clone());
        tx.claim.insert(node_id.to_string());
        tx.timestamp.get_or_insert_with(|| Utc::now().timestamp());

        self.pending.push(tx);
        let index = self.pending.len() - 1;
        Ok(&self.pending[index])
    }

    /// Take every pending transaction, leaving the pool empty
    pub fn drain(&mut self) -> Vec<Transaction> {
        std::mem::take(&mut self.pending)
    }

    /// Put transactions from an uncommitted block back in front of the queue
    ///
    /// Transactions that made it into a block meanwhile are dropped instead.
    pub fn requeue(&mut self, mut transactions: Vec<Transaction>) {
        transactions.retain(|tx| {
            !self.mined.contains(&tx.signature)
                && !self.pending.iter().any(|p| p.signature == tx.signature)
        });
        transactions.append(&mut self.pending);
        self.pending = transactions;
    }

    /// Drop pending copies of transactions mined in `block`
    ///
    /// Their signatures become claimed so gossip cannot bring them back.
    pub fn forget_mined(&mut self, block: &Block) {
        self.record_mined(block);
        self.pending.retain(|tx| !block.contains_transaction(&tx.signature));
    }

    /// Remember that the transactions of `block` are on chain
    pub fn record_mined(&mut self, block: &Block) {
        for tx in &block.transactions {
            self.claimed.insert(tx.signature.clone());
            self.mined.insert(tx.signature.clone());
        }
    }

    /// Pending transactions in arrival order
    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    /// Whether a signature has been claimed
    pub fn is_claimed(&self, signature: &str) -> bool {
        self.claimed.contains(signature)
    }

    /// Get the number of pending transactions
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Check if the pool is empty
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    const NODE: &str = "http://127.0.0.1:8000";

    fn signed_post(content: &str) -> Transaction {
        Transaction::post(&KeyPair::generate(), content).unwrap()
    }

    #[test]
    fn test_submit_and_drain() {
        let mut pool = TransactionPool::new();
        let tx = signed_post("hello");

        let admitted = pool.submit(tx.clone(), NODE).unwrap();
        assert!(admitted.is_claimed_by(NODE));
        assert!(admitted.timestamp.is_some());
        assert_eq!(pool.len(), 1);

        let drained = pool.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].signature, tx.signature);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_duplicate_signature_rejected() {
        let mut pool = TransactionPool::new();
        let tx = signed_post("once");

        assert!(pool.submit(tx.clone(), NODE).is_ok());
        assert!(matches!(
            pool.submit(tx.clone(), NODE),
            Err(MempoolError::AlreadySeen)
        ));
        assert_eq!(pool.len(), 1);

        // Still a duplicate after the pool was drained
        pool.drain();
        assert!(matches!(pool.submit(tx, NODE), Err(MempoolError::AlreadySeen)));
    }

    #[test]
    fn test_loop_back_rejected() {
        let mut pool = TransactionPool::new();
        let mut tx = signed_post("looped");
        tx.claim.insert(NODE.to_string());

        assert!(matches!(pool.submit(tx, NODE), Err(MempoolError::AlreadySeen)));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_forged_signature_rejected() {
        let mut pool = TransactionPool::new();
        let mut tx = signed_post("original");
        tx.author = KeyPair::generate().public_key_hex();

        assert!(matches!(
            pool.submit(tx.clone(), NODE),
            Err(MempoolError::Authentication(_))
        ));
        assert!(pool.is_empty());
        assert!(!pool.is_claimed(&tx.signature));
    }

    #[test]
    fn test_origin_timestamp_kept() {
        let mut pool = TransactionPool::new();
        let mut tx = signed_post("stamped elsewhere");
        tx.timestamp = Some(42);

        let admitted = pool.submit(tx, NODE).unwrap();
        assert_eq!(admitted.timestamp, Some(42));
    }

    #[test]
    fn test_requeue_goes_to_front() {
        let mut pool = TransactionPool::new();
        pool.submit(signed_post("first"), NODE).unwrap();
        let drained = pool.drain();

        pool.submit(signed_post("second"), NODE).unwrap();
        pool.requeue(drained);

        let order: Vec<String> = pool
            .pending()
            .iter()
            .map(|tx| match &tx.payload {
                crate::core::Payload::Post { content } => content.clone(),
                other => panic!("unexpected payload {:?}", other),
            })
            .collect();
        assert_eq!(order, vec!["first", "second"]);
    }

    #[test]
    fn test_forget_mined() {
        let mut pool = TransactionPool::new();
        let mined = signed_post("mined elsewhere");
        let kept = signed_post("still pending");
        pool.submit(mined.clone(), NODE).unwrap();
        pool.submit(kept.clone(), NODE).unwrap();

        let block = Block::new(1, vec![mined.clone()], "00".to_string());
        pool.forget_mined(&block);

        assert_eq!(pool.len(), 1);
        assert_eq!(pool.pending()[0].signature, kept.signature);

        // A transaction first seen inside a block can't be submitted afterwards
        let unseen = signed_post("only in block");
        pool.forget_mined(&Block::new(2, vec![unseen.clone()], "00".to_string()));
        assert!(matches!(pool.submit(unseen, NODE), Err(MempoolError::AlreadySeen)));
    }

    #[test]
    fn test_requeue_skips_mined() {
        let mut pool = TransactionPool::new();
        let taken = signed_post("mined meanwhile");
        let other = signed_post("not mined");
        pool.submit(taken.clone(), NODE).unwrap();
        pool.submit(other.clone(), NODE).unwrap();
        let drained = pool.drain();

        // The drained copy isn't pending, but the block still counts
        pool.forget_mined(&Block::new(1, vec![taken.clone()], "00".to_string()));
        pool.requeue(drained);

        assert_eq!(pool.len(), 1);
        assert_eq!(pool.pending()[0].signature, other.signature);
    }
}
