//! Cryptographic utilities for the ledger
//!
//! This module provides:
//! - SHA-256 hashing and the leading-zero difficulty check
//! - ECDSA key management and signatures (secp256k1)

pub mod hash;
pub mod keys;

pub use hash::{difficulty_prefix, meets_difficulty, sha256, sha256_hex};
pub use keys::{derive_public_key, generate, sign, verify, HexKeyPair, KeyError, KeyPair};
