//! Request and response types for the DEX HTTP API.

use serde::{Deserialize, Serialize};

use crate::serde_helpers::lenient_i64;

/// Response from `GET /api/v1/node-info`.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeInfoResponse {
    pub node_info: NodeInfo,
    #[serde(default)]
    pub sync_info: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeInfo {
    #[serde(default)]
    pub id: String,
    /// Chain id used in sign documents.
    pub network: String,
    #[serde(default)]
    pub moniker: String,
    #[serde(default)]
    pub version: String,
}

/// Response from `GET /api/v1/account/{address}`.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountResponse {
    #[serde(default)]
    pub address: String,
    #[serde(with = "lenient_i64")]
    pub account_number: i64,
    #[serde(with = "lenient_i64")]
    pub sequence: i64,
    #[serde(default)]
    pub balances: Vec<Balance>,
}

impl AccountResponse {
    /// Free balance of a symbol, as the DEX reports it.
    pub fn free_balance(&self, symbol: &str) -> Option<&str> {
        self.balances
            .iter()
            .find(|b| b.symbol == symbol)
            .map(|b| b.free.as_str())
    }
}

/// One token balance. Amounts are decimal strings.
#[derive(Debug, Clone, Deserialize)]
pub struct Balance {
    pub symbol: String,
    #[serde(default)]
    pub free: String,
    #[serde(default)]
    pub locked: String,
    #[serde(default)]
    pub frozen: String,
}

/// One element of the broadcast response array.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TxCommitResult {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub log: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub data: String,
}

/// Optional fields applied to every transaction `send_token` builds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    pub memo: String,
    pub source: i64,
}

impl SendOptions {
    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }

    pub fn with_source(mut self, source: i64) -> Self {
        self.source = source;
        self
    }
}
