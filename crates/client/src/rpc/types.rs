//! Node RPC result types.

use airdrop_codec::{CodecError, StdTx};
use airdrop_types::TxHash;
use serde::{Deserialize, Serialize};

use crate::serde_helpers::{base64_bytes, lenient_i64};
use crate::ClientError;

/// Event type tag for committed transactions.
pub const EVENT_TX: &str = "tendermint/event/Tx";

/// JSON-RPC envelope shared by HTTP and websocket responses.
#[derive(Debug, Deserialize)]
pub(crate) struct RpcResponse<T> {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    pub result: Option<T>,
    pub error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RpcErrorBody {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<String>,
}

impl From<RpcErrorBody> for ClientError {
    fn from(e: RpcErrorBody) -> Self {
        ClientError::Rpc {
            code: e.code,
            message: e.message,
            data: e.data,
        }
    }
}

impl<T> RpcResponse<T> {
    pub fn into_result(self) -> Result<T, ClientError> {
        if let Some(error) = self.error {
            return Err(error.into());
        }
        self.result
            .ok_or_else(|| ClientError::Decode("response has neither result nor error".to_string()))
    }
}

/// Result of `/status`.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultStatus {
    pub node_info: StatusNodeInfo,
    pub sync_info: SyncInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusNodeInfo {
    #[serde(default)]
    pub id: String,
    pub network: String,
    #[serde(default)]
    pub moniker: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncInfo {
    #[serde(default)]
    pub latest_block_hash: String,
    #[serde(with = "lenient_i64")]
    pub latest_block_height: i64,
    #[serde(default)]
    pub latest_block_time: String,
    #[serde(default)]
    pub catching_up: bool,
}

/// Execution result of a transaction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TxResult {
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub log: String,
    #[serde(default)]
    pub info: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<serde_json::Value>,
}

impl TxResult {
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

/// Result of `/tx`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultTx {
    pub hash: String,
    #[serde(with = "lenient_i64")]
    pub height: i64,
    #[serde(default)]
    pub index: u32,
    pub tx_result: TxResult,
    #[serde(with = "base64_bytes")]
    pub tx: Vec<u8>,
}

impl ResultTx {
    pub fn decode_tx(&self) -> Result<StdTx, CodecError> {
        StdTx::decode(&self.tx)
    }
}

/// A committed transaction delivered by a subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxEvent {
    #[serde(with = "lenient_i64")]
    pub height: i64,
    #[serde(default)]
    pub index: u32,
    #[serde(with = "base64_bytes", default)]
    pub tx: Vec<u8>,
    #[serde(default)]
    pub result: TxResult,
}

impl TxEvent {
    pub fn hash(&self) -> TxHash {
        TxHash::of(&self.tx)
    }

    pub fn decode_tx(&self) -> Result<StdTx, CodecError> {
        StdTx::decode(&self.tx)
    }
}

#[derive(Debug, Clone, Serialize)]
pub enum EventData {
    Tx(TxEvent),
    /// Any other event type, kept undecoded.
    Other {
        kind: String,
        value: serde_json::Value,
    },
}

/// One event pushed on a subscription.
#[derive(Debug, Clone, Serialize)]
pub struct ResultEvent {
    pub query: String,
    pub data: EventData,
}

#[derive(Deserialize)]
struct RawResultEvent {
    #[serde(default)]
    query: String,
    data: RawEventData,
}

#[derive(Deserialize)]
struct RawEventData {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    value: serde_json::Value,
}

#[derive(Deserialize)]
struct TxEventValue {
    #[serde(rename = "TxResult")]
    tx_result: TxEvent,
}

impl ResultEvent {
    /// Decode the `result` member of an event message.
    ///
    /// Returns `None` for results without event data, such as the
    /// acknowledgement of a `subscribe` call.
    pub(crate) fn from_result(result: serde_json::Value) -> Result<Option<Self>, ClientError> {
        if result.get("data").is_none() {
            return Ok(None);
        }
        let raw: RawResultEvent =
            serde_json::from_value(result).map_err(|e| ClientError::Decode(e.to_string()))?;
        let data = if raw.data.kind == EVENT_TX {
            let value: TxEventValue = serde_json::from_value(raw.data.value)
                .map_err(|e| ClientError::Decode(format!("tx event: {e}")))?;
            EventData::Tx(value.tx_result)
        } else {
            EventData::Other {
                kind: raw.data.kind,
                value: raw.data.value,
            }
        };
        Ok(Some(Self {
            query: raw.query,
            data,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_result_tx() {
        let json = json!({
            "hash": "AB12",
            "height": "1000",
            "index": 2,
            "tx_result": {"code": 0, "log": "Msg 0: ", "data": null},
            "tx": "AQID"
        });
        let tx: ResultTx = serde_json::from_value(json).unwrap();
        assert_eq!(tx.height, 1000);
        assert_eq!(tx.index, 2);
        assert_eq!(tx.tx, vec![1, 2, 3]);
        assert!(tx.tx_result.is_ok());
    }

    #[test]
    fn test_tx_event() {
        let result = json!({
            "query": "tm.event = 'Tx'",
            "data": {
                "type": "tendermint/event/Tx",
                "value": {"TxResult": {"height": "12", "index": 0, "tx": "AQID", "result": {"code": 65546, "log": "insufficient"}}}
            }
        });
        let event = ResultEvent::from_result(result).unwrap().unwrap();
        assert_eq!(event.query, "tm.event = 'Tx'");
        let EventData::Tx(tx) = event.data else {
            panic!("expected tx event");
        };
        assert_eq!(tx.height, 12);
        assert!(!tx.result.is_ok());
        assert_eq!(tx.hash(), TxHash::of(&[1, 2, 3]));
    }

    #[test]
    fn test_other_event_and_ack() {
        let other = ResultEvent::from_result(json!({
            "query": "tm.event = 'NewBlock'",
            "data": {"type": "tendermint/event/NewBlock", "value": {"block": {}}}
        }))
        .unwrap()
        .unwrap();
        assert!(matches!(other.data, EventData::Other { ref kind, .. } if kind == "tendermint/event/NewBlock"));

        assert!(ResultEvent::from_result(json!({})).unwrap().is_none());
    }

    #[test]
    fn test_rpc_error_envelope() {
        let resp: RpcResponse<ResultTx> = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":"","error":{"code":-32603,"message":"Internal error","data":"tx (AB) not found"}}"#,
        )
        .unwrap();
        match resp.into_result().unwrap_err() {
            ClientError::Rpc { code, data, .. } => {
                assert_eq!(code, -32603);
                assert_eq!(data.as_deref(), Some("tx (AB) not found"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
