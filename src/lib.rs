//! Ledger node: a minimal proof-of-work ledger in Rust
//!
//! This crate provides a single-ledger distributed node featuring:
//! - Proof of work with a leading-zero hex target
//! - ECDSA signed transactions (secp256k1)
//! - Canonical JSON hashing and signing
//! - Transaction pool with signature-based dedup
//! - Longest-valid-chain consensus between HTTP peers
//! - Block and transaction gossip through a bounded worker pool
//!
//! # Example
//!
//! ```rust
//! use ledger_node::core::{Ledger, Transaction};
//! use ledger_node::crypto::KeyPair;
//!
//! // Create a ledger with a mined genesis block
//! let mut ledger = Ledger::new(2).unwrap();
//!
//! // Sign and submit a post
//! let author = KeyPair::generate();
//! let tx = Transaction::post(&author, "hello").unwrap();
//! ledger.submit(tx, "http://127.0.0.1:8000").unwrap();
//!
//! // Mine it
//! let index = ledger.mine_next().unwrap();
//! assert_eq!(index, Some(1));
//! ```

pub mod api;
pub mod cli;
pub mod core;
pub mod crypto;
pub mod mining;
pub mod network;

// Re-export commonly used types
pub use api::{create_router, ApiState};
pub use core::{Block, Blockchain, Ledger, Transaction, DEFAULT_DIFFICULTY};
pub use crypto::KeyPair;
pub use mining::{Miner, TransactionPool};
pub use network::{Node, NodeConfig};
