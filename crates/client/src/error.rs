//! Client error types.

use airdrop_codec::CodecError;

/// Errors from the DEX and node clients.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("RPC error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<String>,
    },

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("No transfers to send")]
    EmptyTransfer,

    #[error("Broadcast returned no results")]
    EmptyBroadcastResult,

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Subscription closed before it was confirmed")]
    SubscriptionClosed,
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        ClientError::WebSocket(e.to_string())
    }
}
