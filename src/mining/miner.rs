//! Mining engine for the ledger
//!
//! Runs the brute-force nonce search on a block and reports how it went.

use crate::core::{Block, DEFAULT_DIFFICULTY};
use crate::crypto::difficulty_prefix;
use log::info;
use std::time::Instant;

/// Mining statistics
#[derive(Debug, Clone)]
pub struct MiningStats {
    /// Number of hash attempts
    pub hash_attempts: u64,
    /// Time taken in milliseconds
    pub time_ms: u128,
    /// Hash rate (hashes per second)
    pub hash_rate: f64,
    /// The hash that satisfied the target
    pub hash: String,
}

/// Proof-of-work miner
#[derive(Debug, Clone, Copy)]
pub struct Miner {
    /// Required leading zero hex characters
    pub difficulty: usize,
}

impl Miner {
    /// Create a new miner
    pub fn new(difficulty: usize) -> Self {
        Self { difficulty }
    }

    /// Mine the block in place
    ///
    /// Runs to completion; there is no cancellation. On return the block's
    /// `nonce` and `hash` satisfy the target.
    pub fn mine(&self, block: &mut Block) -> Result<MiningStats, serde_json::Error> {
        let start = Instant::now();

        info!(
            "Mining block {} with difficulty {} (hash prefix {:?})...",
            block.index,
            self.difficulty,
            difficulty_prefix(self.difficulty)
        );

        let attempts = block.mine(self.difficulty)?;

        let elapsed = start.elapsed().as_millis();
        let hash_rate = if elapsed > 0 {
            (attempts as f64) / (elapsed as f64 / 1000.0)
        } else {
            attempts as f64
        };

        info!(
            "Block {} mined in {}ms ({} attempts, {:.2} H/s)",
            block.index, elapsed, attempts, hash_rate
        );

        Ok(MiningStats {
            hash_attempts: attempts,
            time_ms: elapsed,
            hash_rate,
            hash: block.hash.clone(),
        })
    }
}

impl Default for Miner {
    fn default() -> Self {
        Self::new(DEFAULT_DIFFICULTY)
    }
}
