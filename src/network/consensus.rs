//! Longest-valid-chain selection

use crate::core::{Block, Blockchain};
use log::{debug, info};

/// A chain offered by a peer
#[derive(Debug, Clone)]
pub struct Candidate {
    pub peer: String,
    pub chain: Vec<Block>,
}

/// Pick the chain to adopt, if any
///
/// Candidates are considered in order. One replaces the running best only
/// if it is strictly longer and passes full validation, so ties keep the
/// earlier chain and a longer invalid chain is ignored.
pub fn select_longest(
    local_length: usize,
    candidates: Vec<Candidate>,
    difficulty: usize,
) -> Option<Candidate> {
    let mut best_length = local_length;
    let mut best = None;

    for candidate in candidates {
        let length = candidate.chain.len();
        if length <= best_length {
            debug!(
                "Chain from {} (length {}) is not longer than {}",
                candidate.peer, length, best_length
            );
            continue;
        }
        if !Blockchain::check_chain_validity(&candidate.chain, difficulty) {
            info!(
                "Ignoring invalid chain of length {} from {}",
                length, candidate.peer
            );
            continue;
        }
        best_length = length;
        best = Some(candidate);
    }

    best
}
