//! Ledger state
//!
//! Couples the chain with the pool of pending transactions and the miner.
//! Everything here is synchronous; the node decides which lock it runs under.

use crate::core::block::Block;
use crate::core::blockchain::{Blockchain, BlockchainError, ChainStats};
use crate::core::transaction::Transaction;
use crate::mining::{MempoolError, Miner, MiningStats, TransactionPool};
use log::{info, warn};

/// Chain, pending transactions and miner of one node
#[derive(Debug)]
pub struct Ledger {
    chain: Blockchain,
    pool: TransactionPool,
    miner: Miner,
}

impl Ledger {
    /// Create a ledger with a freshly mined genesis block
    pub fn new(difficulty: usize) -> Result<Self, BlockchainError> {
        let mut ledger = Self {
            chain: Blockchain::empty(difficulty),
            pool: TransactionPool::new(),
            miner: Miner::new(difficulty),
        };
        ledger.create_genesis()?;
        Ok(ledger)
    }

    /// Mine and append a genesis block unconditionally
    pub fn create_genesis(&mut self) -> Result<(), BlockchainError> {
        let genesis = self.chain.create_genesis()?;
        info!("Created genesis block {}", genesis.hash);
        Ok(())
    }

    /// Admit a transaction into the pool, returning the admitted copy
    pub fn submit(&mut self, tx: Transaction, node_id: &str) -> Result<Transaction, MempoolError> {
        self.pool.submit(tx, node_id).cloned()
    }

    /// Drain the pool into an unmined successor of the tip
    ///
    /// `None` when there is nothing to mine.
    pub fn prepare_candidate(&mut self) -> Option<Block> {
        if self.pool.is_empty() {
            return None;
        }
        let transactions = self.pool.drain();
        match self.chain.candidate_block(transactions.clone()) {
            Some(block) => Some(block),
            None => {
                self.pool.requeue(transactions);
                None
            }
        }
    }

    /// Append a block this node mined
    ///
    /// If the tip moved while the nonce was searched the block no longer
    /// links, and its transactions go back to the front of the pool unless
    /// the block that moved the tip already holds them.
    pub fn commit(&mut self, block: Block) -> Result<u64, BlockchainError> {
        let index = block.index;
        let hash = block.hash.clone();
        let transactions = block.transactions.clone();

        match self.chain.add_block(block, &hash) {
            Ok(()) => {
                if let Some(latest) = self.chain.latest_block() {
                    self.pool.record_mined(latest);
                }
                Ok(index)
            }
            Err(e) => {
                warn!(
                    "Discarding mined block {}: {}; requeueing {} transaction(s)",
                    index,
                    e,
                    transactions.len()
                );
                self.requeue(transactions);
                Err(e)
            }
        }
    }

    /// Drain, mine and commit in one step
    ///
    /// Returns the new block's index, or `None` if the pool was empty.
    /// `Node` takes the split path instead (`prepare_candidate`, then
    /// `mine_candidate` off the lock, then `commit`); both end in `commit`.
    pub fn mine_next(&mut self) -> Result<Option<u64>, BlockchainError> {
        let Some(mut block) = self.prepare_candidate() else {
            return Ok(None);
        };
        if let Err(e) = Self::mine_candidate(self.miner, &mut block) {
            self.requeue(block.transactions);
            return Err(e);
        }
        self.commit(block).map(Some)
    }

    /// Run the nonce search for a prepared candidate
    pub fn mine_candidate(miner: Miner, block: &mut Block) -> Result<MiningStats, BlockchainError> {
        Ok(miner.mine(block)?)
    }

    /// Append a block mined by a peer
    pub fn accept_block(&mut self, block: Block) -> Result<(), BlockchainError> {
        let hash = block.hash.clone();
        self.chain.add_block(block, &hash)?;
        if let Some(latest) = self.chain.latest_block() {
            self.pool.forget_mined(latest);
        }
        Ok(())
    }

    /// Replace the chain wholesale
    ///
    /// Transactions already in the adopted chain leave the pool.
    pub fn adopt(&mut self, chain: Blockchain) {
        for block in chain.blocks() {
            self.pool.forget_mined(block);
        }
        info!(
            "Replaced local chain of length {} with chain of length {}",
            self.chain.len(),
            chain.len()
        );
        self.chain = chain;
    }

    /// Put transactions back at the front of the pool
    ///
    /// Anything already on the chain is left out.
    pub fn requeue(&mut self, mut transactions: Vec<Transaction>) {
        transactions.retain(|tx| {
            !self
                .chain
                .blocks()
                .iter()
                .any(|block| block.contains_transaction(&tx.signature))
        });
        self.pool.requeue(transactions);
    }

    pub fn chain(&self) -> &Blockchain {
        &self.chain
    }

    pub fn pool(&self) -> &TransactionPool {
        &self.pool
    }

    pub fn miner(&self) -> Miner {
        self.miner
    }

    pub fn difficulty(&self) -> usize {
        self.chain.difficulty()
    }

    pub fn stats(&self) -> ChainStats {
        self.chain.stats()
    }
}
