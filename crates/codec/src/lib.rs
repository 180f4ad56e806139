//! Transaction encoding and decoding.
//!
//! # Wire Format
//!
//! Transactions use the amino binary encoding, a protobuf-compatible format in
//! which every concrete type registered behind an interface carries a 4-byte
//! type prefix:
//!
//! ```text
//! uvarint(len) || F0625DEE || { msgs, signatures, memo, source, data }
//! ```
//!
//! Messages inside a transaction carry their own prefix, so decoding can
//! dispatch on it. Unknown message types are kept as opaque bytes.
//!
//! # Signing
//!
//! The bytes that get signed are not the binary encoding but a canonical JSON
//! document with sorted keys; see [`StdSignMsg`].

mod amino;
mod json;
mod msg;
mod tx;

pub use amino::{Decoder, Encoder, WireType};
pub use json::{AccountCoinsJson, CoinJson, SendMsgJson};
pub use msg::{AccountCoins, Input, Msg, Output, SendMsg, SEND_MSG_PREFIX};
pub use tx::{
    StdSignMsg, StdSignature, StdTx, PUBKEY_SECP256K1_PREFIX, STD_TX_PREFIX,
};

use thiserror::Error;

/// Errors that can occur during encoding/decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Unexpected end of input")]
    Truncated,

    #[error("Varint overflows 64 bits")]
    VarintOverflow,

    #[error("Unsupported wire type {0}")]
    UnsupportedWireType(u8),

    #[error("Field {field} has unexpected wire type {wire}")]
    UnexpectedWireType { field: u32, wire: u8 },

    #[error("Invalid UTF-8 in string field")]
    InvalidUtf8,

    #[error("Unknown tx structure (prefix {0})")]
    UnknownTxStructure(String),

    #[error("Unsupported public key type (prefix {0})")]
    UnsupportedPubKey(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] airdrop_types::AddressError),

    #[error("Coin amounts overflow")]
    CoinOverflow,

    #[error("Trailing bytes after length-prefixed tx: {0}")]
    TrailingBytes(usize),
}
