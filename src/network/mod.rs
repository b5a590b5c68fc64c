//! Peer-to-peer networking module
//!
//! Nodes talk plain HTTP/JSON to each other.
//!
//! # Features
//! - Peer registry with address normalization
//! - Bootstrap by registering with a running node
//! - Longest-valid-chain consensus
//! - Block and transaction gossip through a bounded worker pool

pub mod announcer;
pub mod client;
pub mod consensus;
pub mod message;
pub mod node;
pub mod peer;

pub use announcer::{Announcer, AnnouncerConfig, AnnouncerStats};
pub use client::PeerClient;
pub use consensus::{select_longest, Candidate};
pub use message::{ChainResponse, MessageResponse, MineResponse, RegisterRequest, ResolveOutcome};
pub use node::{Node, NodeConfig, NodeError, NodeStats};
pub use peer::{endpoint, normalize_address, PeerError, PeerSet};
