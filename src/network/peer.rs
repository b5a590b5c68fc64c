//! Peer registry
//!
//! Peers are identified by their base URL. Addresses are normalized on the
//! way in so `host:port`, `http://host:port` and `http://host:port/` name the
//! same peer.

use std::collections::BTreeSet;
use thiserror::Error;

/// Peer errors
#[derive(Error, Debug)]
pub enum PeerError {
    #[error("Invalid peer address: {0:?}")]
    InvalidAddress(String),
    #[error("Peer {peer} unreachable: {reason}")]
    Unreachable { peer: String, reason: String },
    #[error("Peer {peer} answered with status {status}: {body}")]
    Status {
        peer: String,
        status: u16,
        body: String,
    },
}

/// Normalize a peer address to a base URL
///
/// Adds `http://` when no scheme is given and strips trailing slashes.
pub fn normalize_address(address: &str) -> Result<String, PeerError> {
    let trimmed = address.trim();
    let (scheme, rest) = if let Some(rest) = trimmed.strip_prefix("https://") {
        ("https://", rest)
    } else if let Some(rest) = trimmed.strip_prefix("http://") {
        ("http://", rest)
    } else {
        ("http://", trimmed)
    };
    let host = rest.trim_end_matches('/');

    if host.is_empty() || host.contains(char::is_whitespace) || host.contains("://") {
        return Err(PeerError::InvalidAddress(address.to_string()));
    }

    Ok(format!("{}{}", scheme, host))
}

/// Full URL of an endpoint on a peer
pub fn endpoint(peer: &str, path: &str) -> String {
    format!(
        "{}/{}",
        peer.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// The set of known peers
#[derive(Debug, Clone, Default)]
pub struct PeerSet {
    peers: BTreeSet<String>,
}

impl PeerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a peer; returns `false` if it was already known
    pub fn insert(&mut self, address: &str) -> Result<bool, PeerError> {
        let address = normalize_address(address)?;
        Ok(self.peers.insert(address))
    }

    /// Add every valid address, skipping `own_address`
    ///
    /// Returns the number of peers that were new.
    pub fn merge<I, S>(&mut self, addresses: I, own_address: &str) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let own = normalize_address(own_address).ok();
        let mut added = 0;
        for address in addresses {
            match normalize_address(address.as_ref()) {
                Ok(peer) if Some(&peer) == own.as_ref() => {}
                Ok(peer) => {
                    if self.peers.insert(peer) {
                        added += 1;
                    }
                }
                Err(e) => log::debug!("Ignoring advertised peer: {}", e),
            }
        }
        added
    }

    /// Snapshot of the peers in sorted order
    pub fn to_vec(&self) -> Vec<String> {
        self.peers.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
