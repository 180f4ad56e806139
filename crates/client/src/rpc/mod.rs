//! Node RPC client.
//!
//! Plain HTTP for `/status` and `/tx`, websocket for event subscriptions.
//! Node addresses may use the `tcp://` scheme, which is mapped to `http://`.

mod subscription;
mod types;

pub use subscription::Subscription;
pub use types::{
    EventData, ResultEvent, ResultStatus, ResultTx, StatusNodeInfo, SyncInfo, TxEvent, TxResult,
    EVENT_TX,
};

use airdrop_types::TxHash;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

use crate::query::Query;
use crate::ClientError;
use types::RpcResponse;

/// Per-request timeout for RPC calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for a node's RPC endpoint.
#[derive(Debug, Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    base_url: String,
}

impl RpcClient {
    /// Build a client without contacting the node.
    pub fn new(address: &str) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: normalize_endpoint(address)?,
        })
    }

    /// Build a client and check the node answers `/status`.
    pub async fn connect(address: &str) -> Result<Self, ClientError> {
        let client = Self::new(address)?;
        let status = client.status().await?;
        info!(
            url = %client.base_url,
            network = %status.node_info.network,
            height = status.sync_info.latest_block_height,
            "Connected to node"
        );
        Ok(client)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn status(&self) -> Result<ResultStatus, ClientError> {
        self.call("status").await
    }

    /// Look up a committed transaction by hash.
    pub async fn tx(&self, hash: &TxHash, prove: bool) -> Result<ResultTx, ClientError> {
        debug!(hash = %hash, prove, "Querying tx");
        self.call(&format!("tx?hash=0x{}&prove={}", hash.to_hex(), prove))
            .await
    }

    /// Subscribe to events matching `query`, buffering up to `capacity` events.
    pub async fn subscribe(&self, query: &Query, capacity: usize) -> Result<Subscription, ClientError> {
        Subscription::open(&self.websocket_url(), query, capacity).await
    }

    fn websocket_url(&self) -> String {
        let url = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.base_url.clone()
        };
        format!("{url}/websocket")
    }

    async fn call<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self.http.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        // Nodes report RPC errors with a non-2xx status and a JSON-RPC body.
        match serde_json::from_str::<RpcResponse<T>>(&body) {
            Ok(envelope) => envelope.into_result(),
            Err(_) if !status.is_success() => Err(ClientError::Http {
                status: status.as_u16(),
                body,
            }),
            Err(e) => Err(ClientError::Decode(format!("{e}: {body}"))),
        }
    }
}

/// Map `tcp://` to `http://`, default bare hosts to `http://`, drop trailing slashes.
fn normalize_endpoint(address: &str) -> Result<String, ClientError> {
    let address = address.trim();
    let (scheme, host) = match address.split_once("://") {
        Some((scheme, host)) => (Some(scheme), host),
        None => (None, address),
    };
    let host = host.trim_end_matches('/');
    if host.is_empty() {
        return Err(ClientError::InvalidEndpoint(address.to_string()));
    }
    match scheme {
        None | Some("tcp") | Some("http") => Ok(format!("http://{host}")),
        Some("https") => Ok(format!("https://{host}")),
        Some(other) => Err(ClientError::InvalidEndpoint(format!(
            "unsupported scheme '{other}' in {address}"
        ))),
    }
}
