//! Mining module for block creation and transaction pooling

pub mod mempool;
pub mod miner;

pub use mempool::{MempoolError, TransactionPool};
pub use miner::{Miner, MiningStats};
