//! Blockchain implementation
//!
//! The chain of blocks and the validation rules every block passes through.
//! `add_block` is the single gate for appending; `check_chain_validity`
//! vets whole chains received from peers.

use crate::core::block::{Block, GENESIS_PREVIOUS_HASH};
use crate::core::transaction::Transaction;
use crate::crypto::meets_difficulty;
use serde::Serialize;
use thiserror::Error;

/// Default mining difficulty (number of leading zero hex characters)
pub const DEFAULT_DIFFICULTY: usize = 2;

/// Blockchain-related errors
#[derive(Error, Debug)]
pub enum BlockchainError {
    #[error("Invalid block: {0}")]
    InvalidBlock(String),
    #[error("Chain dump is tampered at block {0}")]
    ChainTampered(u64),
    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// The chain of blocks
#[derive(Debug, Clone, Serialize)]
pub struct Blockchain {
    /// The chain of blocks
    blocks: Vec<Block>,
    /// Mining difficulty
    difficulty: usize,
}

impl Blockchain {
    /// Create a blockchain with a freshly mined genesis block
    pub fn with_difficulty(difficulty: usize) -> Result<Self, BlockchainError> {
        let mut chain = Self::empty(difficulty);
        chain.create_genesis()?;
        Ok(chain)
    }

    /// A chain with no blocks, not even genesis
    pub fn empty(difficulty: usize) -> Self {
        Self {
            blocks: Vec::new(),
            difficulty,
        }
    }

    /// Mine a genesis block and append it without a previous-hash check
    pub fn create_genesis(&mut self) -> Result<&Block, BlockchainError> {
        let mut genesis = Block::genesis();
        genesis.mine(self.difficulty)?;
        self.blocks.push(genesis);
        Ok(&self.blocks[self.blocks.len() - 1])
    }

    /// Get the latest block
    pub fn latest_block(&self) -> Option<&Block> {
        self.blocks.last()
    }

    /// Get a block by index
    pub fn get_block(&self, index: u64) -> Option<&Block> {
        self.blocks.get(usize::try_from(index).ok()?)
    }

    /// All blocks, genesis first
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Consume the chain, returning its blocks
    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }

    /// Number of blocks including genesis
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// True only for a chain without genesis
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Mining difficulty of this chain
    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    /// Check that `claimed_hash` is the block's real hash and meets the target
    ///
    /// Rejects both a cheap hash (missing zero prefix) and a tampered block
    /// (hash no longer matches content).
    pub fn is_valid_proof(block: &Block, claimed_hash: &str, difficulty: usize) -> bool {
        meets_difficulty(claimed_hash, difficulty)
            && block
                .compute_hash()
                .map(|hash| hash == claimed_hash)
                .unwrap_or(false)
    }

    /// Add a block to the chain after verification
    ///
    /// The block must extend the current tip (index and previous hash) and
    /// `claimed_hash` must be a valid proof for it. On success the claimed
    /// hash is stored in the block and the tip advances; on failure the
    /// chain is untouched.
    pub fn add_block(&mut self, mut block: Block, claimed_hash: &str) -> Result<(), BlockchainError> {
        let latest = self
            .latest_block()
            .ok_or_else(|| BlockchainError::InvalidBlock("chain has no genesis".to_string()))?;

        if block.previous_hash != latest.hash {
            return Err(BlockchainError::InvalidBlock(format!(
                "previous hash {} does not match tip {}",
                block.previous_hash, latest.hash
            )));
        }

        if block.index != latest.index + 1 {
            return Err(BlockchainError::InvalidBlock(format!(
                "Invalid index: expected {}, got {}",
                latest.index + 1,
                block.index
            )));
        }

        if !Self::is_valid_proof(&block, claimed_hash, self.difficulty) {
            return Err(BlockchainError::InvalidBlock(
                "Invalid proof of work".to_string(),
            ));
        }

        block.hash = claimed_hash.to_string();
        self.blocks.push(block);
        Ok(())
    }

    /// Validate an entire chain from genesis forward
    ///
    /// Every block must sit at its position, link to its predecessor (the
    /// genesis block links to `"0"`) and carry a valid proof.
    pub fn check_chain_validity(blocks: &[Block], difficulty: usize) -> bool {
        if blocks.is_empty() {
            return false;
        }

        let mut previous_hash = GENESIS_PREVIOUS_HASH;
        for (position, block) in blocks.iter().enumerate() {
            if block.index != position as u64
                || block.previous_hash != previous_hash
                || !Self::is_valid_proof(block, &block.hash, difficulty)
            {
                return false;
            }
            previous_hash = block.hash.as_str();
        }

        true
    }

    /// Rebuild a chain from a remote dump
    ///
    /// The first block is taken as genesis as-is; every later block goes
    /// through `add_block`. Any failure rejects the whole dump.
    pub fn import_chain(dump: Vec<Block>, difficulty: usize) -> Result<Self, BlockchainError> {
        let mut blocks = dump.into_iter();
        let genesis = blocks.next().ok_or(BlockchainError::ChainTampered(0))?;

        let mut chain = Self::empty(difficulty);
        chain.blocks.push(genesis);

        for block in blocks {
            let index = block.index;
            let claimed_hash = block.hash.clone();
            chain.add_block(block, &claimed_hash).map_err(|e| {
                log::warn!("Rejecting chain dump at block {}: {}", index, e);
                BlockchainError::ChainTampered(index)
            })?;
        }

        Ok(chain)
    }

    /// Build the unmined successor of the current tip
    pub fn candidate_block(&self, transactions: Vec<Transaction>) -> Option<Block> {
        let latest = self.latest_block()?;
        Some(Block::new(
            latest.index + 1,
            transactions,
            latest.hash.clone(),
        ))
    }

    /// Get chain statistics
    pub fn stats(&self) -> ChainStats {
        ChainStats {
            length: self.blocks.len(),
            total_transactions: self.blocks.iter().map(Block::tx_count).sum(),
            difficulty: self.difficulty,
            latest_hash: self
                .latest_block()
                .map(|b| b.hash.clone())
                .unwrap_or_default(),
        }
    }
}

/// Chain statistics
#[derive(Debug, Clone, Serialize)]
pub struct ChainStats {
    pub length: usize,
    pub total_transactions: usize,
    pub difficulty: usize,
    pub latest_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    fn mined_successor(chain: &Blockchain, content: &str) -> Block {
        let kp = KeyPair::generate();
        let tx = Transaction::post(&kp, content).unwrap();
        let mut block = chain.candidate_block(vec![tx]).unwrap();
        block.mine(chain.difficulty()).unwrap();
        block
    }

    fn extend(chain: &mut Blockchain, count: usize) {
        for i in 0..count {
            let block = mined_successor(chain, &format!("tx {}", i));
            let hash = block.hash.clone();
            chain.add_block(block, &hash).unwrap();
        }
    }

    #[test]
    fn test_new_blockchain() {
        let chain = Blockchain::with_difficulty(2).unwrap();
        assert_eq!(chain.len(), 1);

        let genesis = chain.latest_block().unwrap();
        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.previous_hash, "0");
        assert!(genesis.hash.starts_with("00"));
        assert!(Blockchain::check_chain_validity(chain.blocks(), 2));
    }

    #[test]
    fn test_add_block_links_to_tip() {
        let mut chain = Blockchain::with_difficulty(2).unwrap();
        extend(&mut chain, 3);

        assert_eq!(chain.len(), 4);
        for pair in chain.blocks().windows(2) {
            assert_eq!(pair[1].previous_hash, pair[0].hash);
            assert_eq!(pair[1].index, pair[0].index + 1);
        }
        assert!(Blockchain::check_chain_validity(chain.blocks(), 2));
    }

    #[test]
    fn test_mismatched_previous_hash_rejected() {
        let mut chain = Blockchain::with_difficulty(2).unwrap();
        let mut block = mined_successor(&chain, "orphan");
        block.previous_hash = "00wrong".to_string();
        block.mine(2).unwrap();
        let hash = block.hash.clone();

        let before = chain.blocks().to_vec();
        assert!(chain.add_block(block, &hash).is_err());
        assert_eq!(chain.blocks(), before.as_slice());
    }

    #[test]
    fn test_wrong_index_rejected() {
        let mut chain = Blockchain::with_difficulty(2).unwrap();
        let mut block = mined_successor(&chain, "skip");
        block.index = 5;
        block.mine(2).unwrap();
        let hash = block.hash.clone();

        assert!(chain.add_block(block, &hash).is_err());
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_tampered_block_fails_proof() {
        let chain = Blockchain::with_difficulty(2).unwrap();
        let block = mined_successor(&chain, "original");
        let hash = block.hash.clone();
        assert!(Blockchain::is_valid_proof(&block, &hash, 2));

        let mut tampered = block.clone();
        tampered.timestamp += 1;
        assert!(!Blockchain::is_valid_proof(&tampered, &hash, 2));

        let mut tampered = block.clone();
        tampered.transactions.clear();
        assert!(!Blockchain::is_valid_proof(&tampered, &hash, 2));

        let mut tampered = block;
        tampered.previous_hash = "0".to_string();
        assert!(!Blockchain::is_valid_proof(&tampered, &hash, 2));
    }

    #[test]
    fn test_cheap_hash_fails_proof() {
        let chain = Blockchain::with_difficulty(2).unwrap();
        let mut block = chain.candidate_block(Vec::new()).unwrap();
        // Find a nonce whose hash does NOT meet the target
        while block.compute_hash().unwrap().starts_with("00") {
            block.nonce += 1;
        }
        let cheap = block.compute_hash().unwrap();
        assert!(!Blockchain::is_valid_proof(&block, &cheap, 2));
    }

    #[test]
    fn test_chain_validity_detects_tampering() {
        let mut chain = Blockchain::with_difficulty(2).unwrap();
        extend(&mut chain, 2);

        let mut blocks = chain.blocks().to_vec();
        blocks[1].transactions.clear();
        assert!(!Blockchain::check_chain_validity(&blocks, 2));

        let mut blocks = chain.blocks().to_vec();
        blocks.swap(1, 2);
        assert!(!Blockchain::check_chain_validity(&blocks, 2));

        assert!(!Blockchain::check_chain_validity(&[], 2));
    }

    #[test]
    fn test_chain_validity_checks_genesis() {
        let chain = Blockchain::with_difficulty(2).unwrap();
        let mut blocks = chain.blocks().to_vec();
        blocks[0].hash = "00forged".to_string();
        assert!(!Blockchain::check_chain_validity(&blocks, 2));
    }

    #[test]
    fn test_import_chain() {
        let mut chain = Blockchain::with_difficulty(2).unwrap();
        extend(&mut chain, 3);

        let imported = Blockchain::import_chain(chain.blocks().to_vec(), 2).unwrap();
        assert_eq!(imported.blocks(), chain.blocks());
    }

    #[test]
    fn test_import_tampered_chain_rejected() {
        let mut chain = Blockchain::with_difficulty(2).unwrap();
        extend(&mut chain, 3);

        let mut dump = chain.blocks().to_vec();
        dump[2].nonce += 1;
        assert!(matches!(
            Blockchain::import_chain(dump, 2),
            Err(BlockchainError::ChainTampered(2))
        ));

        assert!(matches!(
            Blockchain::import_chain(Vec::new(), 2),
            Err(BlockchainError::ChainTampered(0))
        ));
    }

    #[test]
    fn test_import_trusts_first_block() {
        // The first block of a dump is adopted without checks
        let mut genesis = Block::genesis();
        genesis.hash = "not-even-mined".to_string();

        let imported = Blockchain::import_chain(vec![genesis.clone()], 2).unwrap();
        assert_eq!(imported.latest_block(), Some(&genesis));
    }

    #[test]
    fn test_add_block_requires_genesis() {
        let mut chain = Blockchain::empty(2);
        let mut block = Block::new(1, Vec::new(), "00".to_string());
        block.mine(2).unwrap();
        let hash = block.hash.clone();
        assert!(chain.add_block(block, &hash).is_err());
    }

    #[test]
    fn test_stats() {
        let mut chain = Blockchain::with_difficulty(2).unwrap();
        extend(&mut chain, 2);

        let stats = chain.stats();
        assert_eq!(stats.length, 3);
        assert_eq!(stats.total_transactions, 2);
        assert_eq!(stats.latest_hash, chain.latest_block().unwrap().hash);
    }
}
