//! Network clients for the airdrop tool.
//!
//! # Modules
//!
//! - [`dex`]: DEX HTTP API client (account lookup, broadcast, `send_token`)
//! - [`rpc`]: node RPC client (status, tx lookup, websocket event subscription)
//! - [`query`]: event query language used by subscriptions

pub mod dex;
pub mod query;
pub mod rpc;

mod error;
mod serde_helpers;

pub use dex::{AccountResponse, Balance, DexClient, NodeInfoResponse, SendOptions, TxCommitResult};
pub use error::ClientError;
pub use query::{Condition, Operand, Operator, Query, QueryError};
pub use rpc::{
    EventData, ResultEvent, ResultStatus, ResultTx, RpcClient, Subscription, TxEvent, TxResult,
};
