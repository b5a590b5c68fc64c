//! Ledger node
//!
//! The node owns the ledger and the peer set behind one lock and exposes the
//! operations the HTTP layer serves. Proof-of-work and peer I/O always run
//! outside that lock.

use crate::core::{
    Block, Blockchain, BlockchainError, ChainStats, Ledger, Transaction, TransactionError,
    DEFAULT_DIFFICULTY,
};
use crate::crypto::KeyError;
use crate::mining::MempoolError;
use crate::network::announcer::{Announcer, AnnouncerConfig, AnnouncerStats};
use crate::network::client::PeerClient;
use crate::network::consensus::{self, Candidate};
use crate::network::message::{ChainResponse, MineResponse, ResolveOutcome};
use crate::network::peer::{normalize_address, PeerError, PeerSet};
use futures::future::join_all;
use log::{info, warn};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

// =============================================================================
// Configuration
// =============================================================================

/// Node configuration
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Interface to listen on
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Address peers should use to reach this node
    pub advertise_address: Option<String>,
    /// Leading zero hex characters required of block hashes
    pub difficulty: usize,
    /// Peer to register with and copy the chain from at startup
    pub bootstrap_peer: Option<String>,
    /// Time limit for fetching chains and registering
    pub request_timeout: Duration,
    /// Announcement worker pool settings
    pub announcer: AnnouncerConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            advertise_address: None,
            difficulty: DEFAULT_DIFFICULTY,
            bootstrap_peer: None,
            request_timeout: Duration::from_secs(5),
            announcer: AnnouncerConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Socket address to bind
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// This node's identity: the base URL peers reach it at
    ///
    /// Falls back to the listen address, with loopback standing in for a
    /// wildcard host.
    pub fn node_id(&self) -> Result<String, PeerError> {
        match &self.advertise_address {
            Some(address) => normalize_address(address),
            None => {
                let host = if self.host == "0.0.0.0" {
                    "127.0.0.1"
                } else {
                    &self.host
                };
                normalize_address(&format!("{}:{}", host, self.port))
            }
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Errors surfaced by node operations
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("{0}")]
    Validation(String),
    #[error("Transaction signature rejected: {0}")]
    Authentication(KeyError),
    #[error("Transaction already seen")]
    Duplicate,
    #[error("The chain dump is tampered at block {0}")]
    ChainTampered(u64),
    #[error("{0}")]
    PeerUnreachable(PeerError),
    #[error("The block was discarded by the node: {0}")]
    BlockRejected(String),
    #[error("Chain tip moved while mining block {0}")]
    TipMoved(u64),
    #[error("Block {0} not found")]
    BlockNotFound(u64),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<TransactionError> for NodeError {
    fn from(e: TransactionError) -> Self {
        match e {
            TransactionError::Crypto(e) => NodeError::Authentication(e),
            other => NodeError::Validation(format!("Invalid transaction data: {}", other)),
        }
    }
}

impl From<MempoolError> for NodeError {
    fn from(e: MempoolError) -> Self {
        match e {
            MempoolError::AlreadySeen => NodeError::Duplicate,
            MempoolError::Authentication(e) => NodeError::Authentication(e),
        }
    }
}

impl From<PeerError> for NodeError {
    fn from(e: PeerError) -> Self {
        match e {
            PeerError::InvalidAddress(_) => NodeError::Validation(e.to_string()),
            other => NodeError::PeerUnreachable(other),
        }
    }
}

impl From<BlockchainError> for NodeError {
    fn from(e: BlockchainError) -> Self {
        match e {
            BlockchainError::ChainTampered(index) => NodeError::ChainTampered(index),
            BlockchainError::InvalidBlock(reason) => NodeError::BlockRejected(reason),
            BlockchainError::Encoding(e) => NodeError::Internal(e.to_string()),
        }
    }
}

// =============================================================================
// Node
// =============================================================================

/// Snapshot of node counters
#[derive(Debug, Clone, Serialize)]
pub struct NodeStats {
    pub node_id: String,
    pub chain: ChainStats,
    pub pending_transactions: usize,
    pub peers: usize,
    pub announcements: AnnouncerStats,
}

#[derive(Debug)]
struct NodeState {
    ledger: Ledger,
    peers: PeerSet,
}

/// A ledger node
#[derive(Debug)]
pub struct Node {
    config: NodeConfig,
    node_id: String,
    state: Mutex<NodeState>,
    /// Serializes mining so drained transactions stay with one candidate
    mining: Mutex<()>,
    client: PeerClient,
    announcer: Announcer,
}

impl Node {
    /// Create a node with a fresh genesis block
    ///
    /// Must be called inside a tokio runtime; the announcer workers are
    /// spawned here.
    pub fn new(config: NodeConfig) -> Result<Self, NodeError> {
        let node_id = config.node_id()?;
        let ledger = Ledger::new(config.difficulty)?;
        let client = PeerClient::new(config.request_timeout)?;
        let announcer = Announcer::start(config.announcer.clone(), client.clone());

        info!(
            "Node {} ready (difficulty {})",
            node_id, config.difficulty
        );

        Ok(Self {
            config,
            node_id,
            state: Mutex::new(NodeState {
                ledger,
                peers: PeerSet::new(),
            }),
            mining: Mutex::new(()),
            client,
            announcer,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn announcer_stats(&self) -> AnnouncerStats {
        self.announcer.stats()
    }

    pub async fn stats(&self) -> NodeStats {
        let state = self.state.lock().await;
        NodeStats {
            node_id: self.node_id.clone(),
            chain: state.ledger.stats(),
            pending_transactions: state.ledger.pool().len(),
            peers: state.peers.len(),
            announcements: self.announcer.stats(),
        }
    }

    // -------------------------------------------------------------------------
    // Transactions
    // -------------------------------------------------------------------------

    /// Validate, authenticate and pool a transaction, then gossip it
    pub async fn submit_transaction(&self, value: Value) -> Result<Transaction, NodeError> {
        let tx = Transaction::from_value(value)?;

        let (admitted, peers) = {
            let mut state = self.state.lock().await;
            let admitted = state.ledger.submit(tx, &self.node_id)?;
            (admitted, state.peers.to_vec())
        };

        info!("Accepted transaction {}", short(admitted.id()));
        self.announcer.announce_transaction(&admitted, &peers);
        Ok(admitted)
    }

    /// Transactions waiting to be mined
    pub async fn pending(&self) -> Vec<Transaction> {
        self.state.lock().await.ledger.pool().pending().to_vec()
    }

    // -------------------------------------------------------------------------
    // Chain
    // -------------------------------------------------------------------------

    /// The local chain together with the known peers
    pub async fn chain(&self) -> ChainResponse {
        let state = self.state.lock().await;
        let chain = state.ledger.chain().blocks().to_vec();
        ChainResponse {
            length: chain.len(),
            chain,
            peers: state.peers.to_vec(),
        }
    }

    /// Hash recomputed from the stored block's content
    pub async fn block_hash(&self, index: u64) -> Result<String, NodeError> {
        let state = self.state.lock().await;
        let block = state
            .ledger
            .chain()
            .get_block(index)
            .ok_or(NodeError::BlockNotFound(index))?;
        block
            .compute_hash()
            .map_err(|e| NodeError::Internal(e.to_string()))
    }

    /// Mine the pending transactions into a block
    ///
    /// After committing, the node runs consensus and announces the block only
    /// if it survived as the local tip.
    pub async fn mine(&self) -> Result<MineResponse, NodeError> {
        let _mining = self.mining.lock().await;

        let (candidate, miner) = {
            let mut state = self.state.lock().await;
            (state.ledger.prepare_candidate(), state.ledger.miner())
        };
        let Some(mut block) = candidate else {
            return Ok(MineResponse::nothing_to_mine());
        };

        let transactions = block.transactions.clone();
        let searched = tokio::task::spawn_blocking(move || {
            let result = Ledger::mine_candidate(miner, &mut block);
            (block, result)
        })
        .await;

        let block = match searched {
            Ok((block, Ok(_stats))) => block,
            Ok((block, Err(e))) => {
                self.state.lock().await.ledger.requeue(block.transactions);
                return Err(e.into());
            }
            Err(e) => {
                self.state.lock().await.ledger.requeue(transactions);
                return Err(NodeError::Internal(format!("Mining task failed: {}", e)));
            }
        };

        let index = block.index;
        let hash = block.hash.clone();
        {
            let mut state = self.state.lock().await;
            state
                .ledger
                .commit(block.clone())
                .map_err(|_| NodeError::TipMoved(index))?;
        }
        info!("Block #{} is mined ({})", index, short(&hash));

        self.resolve().await;

        let peers = {
            let state = self.state.lock().await;
            let still_tip = state
                .ledger
                .chain()
                .latest_block()
                .map(|tip| tip.hash == hash)
                .unwrap_or(false);
            if still_tip {
                Some(state.peers.to_vec())
            } else {
                None
            }
        };
        match peers {
            Some(peers) => {
                self.announcer.announce_block(&block, &peers);
            }
            None => info!("Block #{} was replaced during consensus, not announcing", index),
        }

        Ok(MineResponse::mined(index))
    }

    /// Append a block mined by a peer
    pub async fn accept_block(&self, block: Block) -> Result<u64, NodeError> {
        let index = block.index;
        let mut state = self.state.lock().await;
        state.ledger.accept_block(block).map_err(|e| {
            info!("Discarding block #{} from peer: {}", index, e);
            NodeError::from(e)
        })?;
        info!("Added block #{} from peer", index);
        Ok(index)
    }

    // -------------------------------------------------------------------------
    // Peers
    // -------------------------------------------------------------------------

    pub async fn peers(&self) -> Vec<String> {
        self.state.lock().await.peers.to_vec()
    }

    /// Add a peer and hand it our chain
    pub async fn register_peer(&self, address: &str) -> Result<ChainResponse, NodeError> {
        let address = normalize_address(address)?;
        if address != self.node_id {
            let added = self.state.lock().await.peers.insert(&address)?;
            if added {
                info!("Registered peer {}", address);
            }
        }
        Ok(self.chain().await)
    }

    /// Register with a remote node and copy its chain and peers
    ///
    /// The local chain is replaced only if the remote dump imports cleanly.
    pub async fn register_with(&self, remote: &str) -> Result<usize, NodeError> {
        let remote = normalize_address(remote)?;
        if remote == self.node_id {
            return Err(NodeError::Validation(
                "Cannot register with this node itself".to_string(),
            ));
        }

        let response = self.client.register(&remote, &self.node_id).await?;
        let chain = Blockchain::import_chain(response.chain, self.config.difficulty)?;
        let length = chain.len();

        let mut state = self.state.lock().await;
        state.ledger.adopt(chain);
        state.peers.insert(&remote)?;
        state.peers.merge(&response.peers, &self.node_id);
        info!(
            "Registered with {}; chain length {}, {} peer(s) known",
            remote,
            length,
            state.peers.len()
        );
        Ok(length)
    }

    /// Register with the configured bootstrap peer, if any
    pub async fn bootstrap(&self) -> Result<(), NodeError> {
        let Some(peer) = self.config.bootstrap_peer.clone() else {
            return Ok(());
        };
        self.register_with(&peer).await.map(|_| ())
    }

    // -------------------------------------------------------------------------
    // Consensus
    // -------------------------------------------------------------------------

    /// Adopt the longest valid chain among the peers
    ///
    /// Peer chains are fetched concurrently without holding the lock. Peers
    /// advertised by reachable peers are added to the peer set.
    pub async fn resolve(&self) -> ResolveOutcome {
        let (peers, local_length) = {
            let state = self.state.lock().await;
            (state.peers.to_vec(), state.ledger.chain().len())
        };

        let fetches = peers.iter().map(|peer| async move {
            (peer.clone(), self.client.fetch_chain(peer).await)
        });
        let responses = join_all(fetches).await;

        let mut candidates = Vec::new();
        let mut discovered = Vec::new();
        let mut unreachable = Vec::new();
        for (peer, response) in responses {
            match response {
                Ok(response) => {
                    discovered.extend(response.peers);
                    candidates.push(Candidate {
                        peer,
                        chain: response.chain,
                    });
                }
                Err(e) => {
                    warn!("Skipping peer during consensus: {}", e);
                    unreachable.push(peer);
                }
            }
        }

        let winner = consensus::select_longest(local_length, candidates, self.config.difficulty);

        let mut state = self.state.lock().await;
        let added = state.peers.merge(&discovered, &self.node_id);
        if added > 0 {
            info!("Discovered {} new peer(s)", added);
        }

        let mut source = None;
        if let Some(winner) = winner {
            if winner.chain.len() > state.ledger.chain().len() {
                match Blockchain::import_chain(winner.chain, self.config.difficulty) {
                    Ok(chain) => {
                        info!("Adopting chain of length {} from {}", chain.len(), winner.peer);
                        state.ledger.adopt(chain);
                        source = Some(winner.peer);
                    }
                    Err(e) => warn!("Chain from {} failed import: {}", winner.peer, e),
                }
            }
        }

        ResolveOutcome {
            replaced: source.is_some(),
            length: state.ledger.chain().len(),
            source,
            unreachable,
        }
    }
}

fn short(hash: &str) -> &str {
    hash.get(..16).unwrap_or(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use serde_json::json;
    use std::sync::Arc;

    fn offline_config() -> NodeConfig {
        NodeConfig {
            port: 18000,
            request_timeout: Duration::from_millis(500),
            announcer: AnnouncerConfig {
                workers: 1,
                queue_capacity: 16,
                timeout: Duration::from_millis(500),
            },
            ..NodeConfig::default()
        }
    }

    fn signed_post(content: &str) -> Value {
        let tx = Transaction::post(&KeyPair::generate(), content).unwrap();
        serde_json::to_value(tx).unwrap()
    }

    #[test]
    fn test_node_id() {
        let config = NodeConfig {
            host: "0.0.0.0".to_string(),
            port: 9000,
            ..NodeConfig::default()
        };
        assert_eq!(config.node_id().unwrap(), "http://127.0.0.1:9000");
        assert_eq!(config.listen_address(), "0.0.0.0:9000");

        let config = NodeConfig {
            advertise_address: Some("node-a.local:8000/".to_string()),
            ..NodeConfig::default()
        };
        assert_eq!(config.node_id().unwrap(), "http://node-a.local:8000");
    }

    #[tokio::test]
    async fn test_new_node_has_genesis() {
        let node = Node::new(offline_config()).unwrap();
        let chain = node.chain().await;

        assert_eq!(chain.length, 1);
        assert!(chain.chain[0].is_genesis());
        assert!(chain.peers.is_empty());
    }

    #[tokio::test]
    async fn test_submit_transaction() {
        let node = Node::new(offline_config()).unwrap();

        let admitted = node.submit_transaction(signed_post("hello")).await.unwrap();
        assert!(admitted.is_claimed_by(node.node_id()));
        assert!(admitted.timestamp.is_some());
        assert_eq!(node.pending().await.len(), 1);
    }

    #[tokio::test]
    async fn test_submit_rejections() {
        let node = Node::new(offline_config()).unwrap();

        let missing = json!({"author": "abc", "signature": "def"});
        assert!(matches!(
            node.submit_transaction(missing).await,
            Err(NodeError::Validation(_))
        ));

        let mut forged = signed_post("forged");
        forged["content"] = json!("changed");
        assert!(matches!(
            node.submit_transaction(forged).await,
            Err(NodeError::Authentication(_))
        ));

        let tx = signed_post("twice");
        node.submit_transaction(tx.clone()).await.unwrap();
        assert!(matches!(
            node.submit_transaction(tx).await,
            Err(NodeError::Duplicate)
        ));

        assert_eq!(node.pending().await.len(), 1);
    }

    #[tokio::test]
    async fn test_mine() {
        let node = Node::new(offline_config()).unwrap();
        assert_eq!(node.mine().await.unwrap(), MineResponse::nothing_to_mine());

        node.submit_transaction(signed_post("to be mined")).await.unwrap();
        assert_eq!(node.mine().await.unwrap(), MineResponse::mined(1));

        let chain = node.chain().await;
        assert_eq!(chain.length, 2);
        assert!(node.pending().await.is_empty());
        assert_eq!(node.stats().await.chain.total_transactions, 1);
        assert!(Blockchain::check_chain_validity(&chain.chain, 2));
        assert_eq!(node.block_hash(1).await.unwrap(), chain.chain[1].hash);
    }

    #[tokio::test]
    async fn test_block_hash_not_found() {
        let node = Node::new(offline_config()).unwrap();
        assert!(matches!(
            node.block_hash(7).await,
            Err(NodeError::BlockNotFound(7))
        ));
    }

    #[tokio::test]
    async fn test_register_peer() {
        let node = Node::new(offline_config()).unwrap();

        let response = node.register_peer("127.0.0.1:18001").await.unwrap();
        assert_eq!(response.length, 1);
        assert_eq!(response.peers, vec!["http://127.0.0.1:18001"]);

        // Again, and ourselves: both ignored
        node.register_peer("http://127.0.0.1:18001/").await.unwrap();
        node.register_peer(node.node_id().to_string().as_str()).await.unwrap();
        assert_eq!(node.peers().await.len(), 1);

        assert!(matches!(
            node.register_peer("").await,
            Err(NodeError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_accept_block_rejects_unlinked() {
        let node = Node::new(offline_config()).unwrap();
        let mut block = Block::new(1, Vec::new(), "00unknown".to_string());
        block.mine(2).unwrap();

        assert!(matches!(
            node.accept_block(block).await,
            Err(NodeError::BlockRejected(_))
        ));
        assert_eq!(node.chain().await.length, 1);
    }

    #[tokio::test]
    async fn test_resolve_skips_unreachable() {
        let node = Node::new(offline_config()).unwrap();
        node.register_peer("http://127.0.0.1:1").await.unwrap();

        let outcome = node.resolve().await;
        assert!(!outcome.replaced);
        assert_eq!(outcome.length, 1);
        assert_eq!(outcome.unreachable, vec!["http://127.0.0.1:1"]);
    }

    #[tokio::test]
    async fn test_register_with_unreachable() {
        let node = Node::new(offline_config()).unwrap();
        assert!(matches!(
            node.register_with("http://127.0.0.1:1").await,
            Err(NodeError::PeerUnreachable(_))
        ));
        assert!(matches!(
            node.register_with(node.node_id().to_string().as_str()).await,
            Err(NodeError::Validation(_))
        ));
        assert_eq!(node.chain().await.length, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_mining_races_submits_and_peer_block() {
        let node = Arc::new(
            Node::new(NodeConfig {
                difficulty: 3,
                ..offline_config()
            })
            .unwrap(),
        );

        let mut admitted = Vec::new();
        for i in 0..5 {
            let tx = node
                .submit_transaction(signed_post(&format!("before {}", i)))
                .await
                .unwrap();
            admitted.push(tx.signature);
        }
        let shared = node.submit_transaction(signed_post("shared")).await.unwrap();
        admitted.push(shared.signature.clone());

        // A competing block from a peer holding one of our pending transactions
        let genesis = node.chain().await.chain[0].hash.clone();
        let outsider = Transaction::post(&KeyPair::generate(), "peer only").unwrap();
        let mut peer_block = Block::new(1, vec![shared, outsider.clone()], genesis);
        peer_block.mine(3).unwrap();

        let mining = tokio::spawn({
            let node = node.clone();
            async move { node.mine().await }
        });
        let submitting = tokio::spawn({
            let node = node.clone();
            async move {
                let mut signatures = Vec::new();
                for i in 0..5 {
                    let tx = node
                        .submit_transaction(signed_post(&format!("during {}", i)))
                        .await
                        .unwrap();
                    signatures.push(tx.signature);
                    tokio::task::yield_now().await;
                }
                signatures
            }
        });
        let relaying = tokio::spawn({
            let node = node.clone();
            async move { node.accept_block(peer_block).await }
        });

        let first = mining.await.unwrap();
        assert!(matches!(first, Ok(_) | Err(NodeError::TipMoved(_))));
        admitted.extend(submitting.await.unwrap());
        let _ = relaying.await.unwrap();

        for _ in 0..4 {
            match node.mine().await {
                Ok(response) if response == MineResponse::nothing_to_mine() => break,
                Ok(_) | Err(NodeError::TipMoved(_)) => continue,
                Err(e) => panic!("mining failed: {}", e),
            }
        }

        let chain = node.chain().await;
        let pending = node.pending().await;
        assert!(pending.is_empty());
        assert!(Blockchain::check_chain_validity(&chain.chain, 3));

        let occurrences = |signature: &str| {
            chain
                .chain
                .iter()
                .flat_map(|block| block.transactions.iter())
                .chain(pending.iter())
                .filter(|tx| tx.signature == signature)
                .count()
        };
        for signature in &admitted {
            assert_eq!(occurrences(signature), 1, "signature {}", signature);
        }
        assert!(occurrences(&outsider.signature) <= 1);
    }
}
