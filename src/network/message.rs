//! Wire types exchanged between nodes and clients

use crate::core::Block;
use serde::{Deserialize, Serialize};

/// Full chain as served by `GET /chain` and `POST /register_node`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainResponse {
    pub length: usize,
    pub chain: Vec<Block>,
    #[serde(default)]
    pub peers: Vec<String>,
}

/// Body of `POST /register_node` and `POST /register_with`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub node_address: String,
}

/// Result of `GET /mine`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MineResponse {
    pub mined: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl MineResponse {
    pub fn mined(index: u64) -> Self {
        Self {
            mined: true,
            index: Some(index),
            message: None,
        }
    }

    pub fn nothing_to_mine() -> Self {
        Self {
            mined: false,
            index: None,
            message: Some("No transactions to mine".to_string()),
        }
    }
}

/// Result of a consensus round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolveOutcome {
    /// Whether the local chain was replaced
    pub replaced: bool,
    /// Local chain length after the round
    pub length: usize,
    /// Peer whose chain was adopted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Peers that could not be reached
    pub unreachable: Vec<String>,
}

/// Plain acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
