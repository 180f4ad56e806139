//! Transaction lookup and decoding.

use airdrop_client::{ResultTx, RpcClient};
use airdrop_codec::{Msg, StdTx};
use airdrop_types::{Network, TxHash};
use tracing::{debug, info};

use crate::AirdropError;

/// A committed transaction with its decoded body.
#[derive(Debug, Clone)]
pub struct TxDetail {
    pub result: ResultTx,
    pub tx: StdTx,
}

impl TxDetail {
    pub fn first_msg(&self) -> Option<&Msg> {
        self.tx.first_msg()
    }

    /// Print the execution result, the decoded transaction and its first message.
    pub fn print(&self, network: Network) {
        println!("tx result is:\n {}", to_json_string(&self.result));
        println!("txdata, {}", self.tx.to_json(network));
        if let Some(line) = describe_first_msg(&self.tx, network) {
            println!("{line}");
        }
    }
}

/// Fetch a transaction by its hex hash and decode it.
pub async fn inspect_tx(client: &RpcClient, hash: &str) -> Result<TxDetail, AirdropError> {
    let hash = TxHash::from_hex(hash.trim())?;
    let result = client.tx(&hash, false).await?;
    info!(
        hash = %hash,
        height = result.height,
        code = result.tx_result.code,
        "Fetched tx"
    );

    let tx = result.decode_tx()?;
    debug!(msgs = tx.msgs.len(), memo = %tx.memo, "Decoded tx");
    Ok(TxDetail { result, tx })
}

/// One line describing the first message: the send as JSON, or a marker
/// for message types that are not modelled. `None` for an empty transaction.
pub fn describe_first_msg(tx: &StdTx, network: Network) -> Option<String> {
    match tx.first_msg()? {
        Msg::Send(send) => Some(format!(
            "tx msg is:\n {}",
            to_json_string(&send.to_json(network))
        )),
        Msg::Unknown { .. } => Some("unknown tx msg".to_string()),
    }
}

pub(crate) fn to_json_string<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}
