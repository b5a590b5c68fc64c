//! Core ledger components
//!
//! This module contains the fundamental building blocks:
//! - Canonical serialization for hashing and signing
//! - Transactions (posts and transfers, signed by their author)
//! - Blocks (with proof of work)
//! - Blockchain (linkage and proof validation)
//! - Ledger (chain plus pending transactions)

pub mod block;
pub mod blockchain;
pub mod codec;
pub mod ledger;
pub mod transaction;

pub use block::{Block, GENESIS_PREVIOUS_HASH};
pub use blockchain::{Blockchain, BlockchainError, ChainStats, DEFAULT_DIFFICULTY};
pub use codec::FieldExclusion;
pub use ledger::Ledger;
pub use transaction::{Payload, Transaction, TransactionError};
