//! ECDSA key management for the ledger
//!
//! Provides key pair generation, signing, and verification using
//! the secp256k1 elliptic curve. Keys and signatures travel as hex:
//! 32-byte private keys, 33-byte compressed public keys and 64-byte
//! compact signatures. Messages are hashed with SHA-256 before signing.

use rand::rngs::OsRng;
use secp256k1::{ecdsa, Message, PublicKey, Secp256k1, SecretKey};
use serde::Serialize;
use thiserror::Error;

use super::hash::sha256;

/// Errors that can occur during key operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("Invalid key")]
    InvalidKey,
    #[error("Signature verification failed")]
    SignatureInvalid,
}

/// A key pair consisting of a private key and its corresponding public key
#[derive(Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from a hex-encoded private key
    pub fn from_private_key_hex(hex_key: &str) -> Result<Self, KeyError> {
        let secret_key = parse_secret_key(hex_key)?;
        let secp = Secp256k1::new();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        Ok(Self {
            secret_key,
            public_key,
        })
    }

    /// Get the private key as a hex string
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    /// Get the public key as a hex string (compressed format)
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.serialize())
    }

    /// Sign arbitrary bytes with the private key
    pub fn sign(&self, data: &[u8]) -> String {
        sign_with(&self.secret_key, data)
    }

    /// Hex view of the pair, as handed out to account holders
    pub fn to_hex(&self) -> HexKeyPair {
        HexKeyPair {
            private_key: self.private_key_hex(),
            public_key: self.public_key_hex(),
        }
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

/// Hex-encoded key material
#[derive(Debug, Clone, Serialize)]
pub struct HexKeyPair {
    pub private_key: String,
    pub public_key: String,
}

/// Generate a fresh key pair as `(private_key, public_key)` hex strings
pub fn generate() -> (String, String) {
    let pair = KeyPair::generate();
    (pair.private_key_hex(), pair.public_key_hex())
}

/// Derive the hex public key that belongs to a hex private key
pub fn derive_public_key(private_key: &str) -> Result<String, KeyError> {
    KeyPair::from_private_key_hex(private_key).map(|kp| kp.public_key_hex())
}

/// Sign bytes with a hex private key, returning a hex compact signature
///
/// Signing is deterministic (RFC 6979 nonces).
pub fn sign(private_key: &str, data: &[u8]) -> Result<String, KeyError> {
    let secret_key = parse_secret_key(private_key)?;
    Ok(sign_with(&secret_key, data))
}

/// Verify a hex signature over `data` against a hex public key
///
/// Any malformed input is reported as `SignatureInvalid`.
pub fn verify(public_key: &str, signature: &str, data: &[u8]) -> Result<(), KeyError> {
    let key_bytes = hex::decode(public_key).map_err(|_| KeyError::SignatureInvalid)?;
    let public_key =
        PublicKey::from_slice(&key_bytes).map_err(|_| KeyError::SignatureInvalid)?;

    let sig_bytes = hex::decode(signature).map_err(|_| KeyError::SignatureInvalid)?;
    let signature =
        ecdsa::Signature::from_compact(&sig_bytes).map_err(|_| KeyError::SignatureInvalid)?;

    let secp = Secp256k1::verification_only();
    secp.verify_ecdsa(&digest(data), &signature, &public_key)
        .map_err(|_| KeyError::SignatureInvalid)
}

fn parse_secret_key(hex_key: &str) -> Result<SecretKey, KeyError> {
    let bytes = hex::decode(hex_key).map_err(|_| KeyError::InvalidKey)?;
    SecretKey::from_slice(&bytes).map_err(|_| KeyError::InvalidKey)
}

fn sign_with(secret_key: &SecretKey, data: &[u8]) -> String {
    let secp = Secp256k1::signing_only();
    let signature = secp.sign_ecdsa(&digest(data), secret_key);
    hex::encode(signature.serialize_compact())
}

fn digest(data: &[u8]) -> Message {
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&sha256(data));
    Message::from_digest(hash)
}
