//! HTTP client for talking to peers

use crate::core::{Block, Transaction};
use crate::network::message::{ChainResponse, RegisterRequest};
use crate::network::peer::{endpoint, PeerError};
use reqwest::{Client, Response};
use serde::Serialize;
use std::time::Duration;

/// Thin wrapper over `reqwest` with the peer endpoints
#[derive(Debug, Clone)]
pub struct PeerClient {
    client: Client,
}

impl PeerClient {
    /// Create a client whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, PeerError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PeerError::Unreachable {
                peer: String::new(),
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }

    /// `GET /chain`
    pub async fn fetch_chain(&self, peer: &str) -> Result<ChainResponse, PeerError> {
        let response = self
            .client
            .get(endpoint(peer, "chain"))
            .send()
            .await
            .map_err(|e| unreachable(peer, e))?;
        let response = check_status(peer, response).await?;
        response
            .json::<ChainResponse>()
            .await
            .map_err(|e| unreachable(peer, e))
    }

    /// `POST /register_node` with our own address; returns the peer's chain
    pub async fn register(&self, peer: &str, own_address: &str) -> Result<ChainResponse, PeerError> {
        let request = RegisterRequest {
            node_address: own_address.to_string(),
        };
        let response = self.post(peer, "register_node", &request).await?;
        response
            .json::<ChainResponse>()
            .await
            .map_err(|e| unreachable(peer, e))
    }

    /// `POST /add_block`
    pub async fn send_block(&self, peer: &str, block: &Block) -> Result<(), PeerError> {
        self.post(peer, "add_block", block).await.map(|_| ())
    }

    /// `POST /new_transaction`
    pub async fn send_transaction(&self, peer: &str, tx: &Transaction) -> Result<(), PeerError> {
        self.post(peer, "new_transaction", tx).await.map(|_| ())
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        peer: &str,
        path: &str,
        body: &T,
    ) -> Result<Response, PeerError> {
        let response = self
            .client
            .post(endpoint(peer, path))
            .json(body)
            .send()
            .await
            .map_err(|e| unreachable(peer, e))?;
        check_status(peer, response).await
    }
}

fn unreachable(peer: &str, error: reqwest::Error) -> PeerError {
    PeerError::Unreachable {
        peer: peer.to_string(),
        reason: error.to_string(),
    }
}

async fn check_status(peer: &str, response: Response) -> Result<Response, PeerError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(PeerError::Status {
        peer: peer.to_string(),
        status: status.as_u16(),
        body,
    })
}
