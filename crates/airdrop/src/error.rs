use airdrop_client::{ClientError, QueryError};
use airdrop_codec::CodecError;
use airdrop_types::{AddressError, AmountError, HashError};
use std::path::PathBuf;

/// Errors from the airdrop workflows.
#[derive(Debug, thiserror::Error)]
pub enum AirdropError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid recipients JSON: {0}")]
    RecipientsJson(#[source] serde_json::Error),

    #[error("Invalid recipient address {address}: {source}")]
    InvalidAddress {
        address: String,
        source: AddressError,
    },

    #[error("Invalid amount for {address}: {source}")]
    InvalidAmount {
        address: String,
        source: AmountError,
    },

    #[error("Invalid transaction hash: {0}")]
    InvalidHash(#[from] HashError),

    #[error("Invalid query: {0}")]
    Query(#[from] QueryError),

    #[error("Failed to decode transaction: {0}")]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Event listener failed: {0}")]
    Listener(#[from] tokio::task::JoinError),
}
