//! Encrypted keystore files and key management.
//!
//! # Modules
//!
//! - [`keystore`]: the v1 JSON keystore format (PBKDF2 + AES-256-CTR + Keccak-512 MAC)
//! - [`manager`]: [`KeyManager`], an unlocked key bound to a network

pub mod keystore;
pub mod manager;

pub use keystore::{CipherParams, CryptoJson, KdfParams, KeyStore, DEFAULT_KDF_ROUNDS};
pub use manager::KeyManager;

use thiserror::Error;

/// Errors loading or unlocking a keystore.
#[derive(Debug, Error)]
pub enum KeystoreError {
    #[error("Failed to read keystore {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed keystore JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid hex in field {0}")]
    InvalidHex(&'static str),

    #[error("Unsupported cipher: {0}")]
    UnsupportedCipher(String),

    #[error("Unsupported KDF: {0}")]
    UnsupportedKdf(String),

    #[error("Unsupported PRF: {0}")]
    UnsupportedPrf(String),

    #[error("Invalid KDF parameters: {0}")]
    InvalidKdfParams(String),

    #[error("Invalid passphrase (MAC mismatch)")]
    InvalidPassphrase,

    #[error("Invalid private key: {0}")]
    InvalidKey(#[from] airdrop_types::CryptoError),

    #[error("Keystore address {stored} does not match key address {derived}")]
    AddressMismatch { stored: String, derived: String },
}
