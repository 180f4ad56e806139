//! DEX HTTP API client.
//!
//! Builds, signs and broadcasts token transfers on behalf of one key.

mod types;

pub use types::{AccountResponse, Balance, NodeInfo, NodeInfoResponse, SendOptions, TxCommitResult};

use airdrop_codec::{SendMsg, StdSignMsg};
use airdrop_keystore::KeyManager;
use airdrop_types::{Network, Transfer};
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

use crate::ClientError;

/// Per-request timeout for DEX calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for one DEX API endpoint, signing with one key.
#[derive(Debug, Clone)]
pub struct DexClient {
    http: reqwest::Client,
    base_url: String,
    chain_id: String,
    key_manager: KeyManager,
}

impl DexClient {
    /// Connect to a DEX endpoint and resolve its chain id from `node-info`.
    pub async fn new(base_url: &str, key_manager: KeyManager) -> Result<Self, ClientError> {
        let mut client = Self::with_chain_id(base_url, key_manager, String::new())?;
        let node_info = client.node_info().await?;
        client.chain_id = node_info.node_info.network;
        info!(
            base_url = %client.base_url,
            chain_id = %client.chain_id,
            address = %client.key_manager.address_string(),
            "Connected to DEX"
        );
        Ok(client)
    }

    /// Build a client with a known chain id, without contacting the endpoint.
    pub fn with_chain_id(
        base_url: &str,
        key_manager: KeyManager,
        chain_id: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: normalize_base_url(base_url),
            chain_id: chain_id.into(),
            key_manager,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn network(&self) -> Network {
        self.key_manager.network()
    }

    pub fn key_manager(&self) -> &KeyManager {
        &self.key_manager
    }

    pub async fn node_info(&self) -> Result<NodeInfoResponse, ClientError> {
        let url = format!("{}/api/v1/node-info", self.base_url);
        read_json(self.http.get(url).send().await?).await
    }

    pub async fn account(&self, address: &str) -> Result<AccountResponse, ClientError> {
        let url = format!("{}/api/v1/account/{}", self.base_url, address);
        read_json(self.http.get(url).send().await?).await
    }

    /// Broadcast an encoded transaction (with its length prefix).
    ///
    /// With `sync` the DEX waits for the transaction to pass `CheckTx`.
    pub async fn broadcast(&self, tx_bytes: &[u8], sync: bool) -> Result<TxCommitResult, ClientError> {
        let url = format!("{}/api/v1/broadcast?sync={}", self.base_url, sync);
        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "text/plain")
            .body(hex::encode(tx_bytes))
            .send()
            .await?;
        let results: Vec<TxCommitResult> = read_json(response).await?;
        results
            .into_iter()
            .next()
            .ok_or(ClientError::EmptyBroadcastResult)
    }

    /// Send tokens to one or more recipients in a single transaction.
    ///
    /// Fetches the sender's account number and sequence, signs one `SendMsg`
    /// covering every transfer, and broadcasts it.
    pub async fn send_token(
        &self,
        transfers: &[Transfer],
        sync: bool,
        options: &SendOptions,
    ) -> Result<TxCommitResult, ClientError> {
        if transfers.is_empty() {
            return Err(ClientError::EmptyTransfer);
        }

        let account = self.account(&self.key_manager.address_string()).await?;
        let msg = SendMsg::from_transfers(self.key_manager.address(), transfers)?;

        let sign_msg = StdSignMsg {
            chain_id: self.chain_id.clone(),
            account_number: account.account_number,
            sequence: account.sequence,
            memo: options.memo.clone(),
            source: options.source,
            msgs: vec![msg],
        };
        let tx = sign_msg.sign(self.key_manager.private_key(), self.network());
        let hash = tx.hash();

        debug!(
            hash = %hash,
            account_number = account.account_number,
            sequence = account.sequence,
            outputs = transfers.len(),
            "Broadcasting transfer"
        );

        let mut result = self.broadcast(&tx.encode_for_broadcast(), sync).await?;
        if result.hash.is_empty() {
            result.hash = hash.to_hex();
        }
        Ok(result)
    }
}

/// Accept bare hosts as `https://` and drop trailing slashes.
fn normalize_base_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    if url.contains("://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ClientError::Http {
            status: status.as_u16(),
            body,
        });
    }
    serde_json::from_str(&body).map_err(|e| ClientError::Decode(format!("{e}: {body}")))
}
