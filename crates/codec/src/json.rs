//! JSON forms of messages and transactions.
//!
//! The sign document must be byte-for-byte canonical: keys sorted, no
//! whitespace. Struct fields below are declared in alphabetical order so that
//! `serde_json` emits them sorted regardless of map implementation.

use airdrop_types::Network;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::msg::{AccountCoins, Msg, SendMsg};
use crate::tx::{StdSignMsg, StdTx};

/// JSON form of a coin (`amount` is a number, not a string).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinJson {
    pub amount: i64,
    pub denom: String,
}

/// JSON form of an input or output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCoinsJson {
    pub address: String,
    pub coins: Vec<CoinJson>,
}

impl AccountCoinsJson {
    fn new(ac: &AccountCoins, network: Network) -> Self {
        Self {
            address: ac.address.to_bech32(network),
            coins: ac
                .coins
                .iter()
                .map(|c| CoinJson {
                    amount: c.amount,
                    denom: c.denom.clone(),
                })
                .collect(),
        }
    }
}

/// JSON form of a send message, as embedded in the sign document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMsgJson {
    pub inputs: Vec<AccountCoinsJson>,
    pub outputs: Vec<AccountCoinsJson>,
}

impl SendMsg {
    /// Render with bech32 addresses for `network`.
    pub fn to_json(&self, network: Network) -> SendMsgJson {
        SendMsgJson {
            inputs: self
                .inputs
                .iter()
                .map(|i| AccountCoinsJson::new(i, network))
                .collect(),
            outputs: self
                .outputs
                .iter()
                .map(|o| AccountCoinsJson::new(o, network))
                .collect(),
        }
    }
}

/// Canonical document signed by the sender.
#[derive(Debug, Serialize)]
pub(crate) struct StdSignDoc<'a> {
    account_number: String,
    chain_id: &'a str,
    data: Option<String>,
    memo: &'a str,
    msgs: Vec<SendMsgJson>,
    sequence: String,
    source: String,
}

impl<'a> StdSignDoc<'a> {
    pub(crate) fn new(msg: &'a StdSignMsg, network: Network) -> Self {
        Self {
            account_number: msg.account_number.to_string(),
            chain_id: &msg.chain_id,
            data: None,
            memo: &msg.memo,
            msgs: msg.msgs.iter().map(|m| m.to_json(network)).collect(),
            sequence: msg.sequence.to_string(),
            source: msg.source.to_string(),
        }
    }

    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        // Serializing plain structs of strings and integers cannot fail.
        let json = serde_json::to_string(self).unwrap_or_default();
        escape_html(&json).into_bytes()
    }
}

/// Applies the node's HTML-safe string escaping to serialized JSON.
///
/// `&`, `<` and `>` never appear outside string literals in JSON, so a
/// plain substitution only touches string contents. U+2028 and U+2029 are
/// escaped the same way.
fn escape_html(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '&' => out.push_str("\\u0026"),
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c => out.push(c),
        }
    }
    out
}

impl Msg {
    /// Human-readable JSON for logs.
    pub fn to_json(&self, network: Network) -> serde_json::Value {
        match self {
            Msg::Send(send) => json!({ "send": send.to_json(network) }),
            Msg::Unknown { prefix, body } => json!({
                "unknown": {
                    "prefix": hex::encode(prefix),
                    "body": hex::encode(body),
                }
            }),
        }
    }
}

impl StdTx {
    /// Human-readable JSON for logs.
    pub fn to_json(&self, network: Network) -> serde_json::Value {
        let signatures: Vec<_> = self
            .signatures
            .iter()
            .map(|s| {
                json!({
                    "pub_key": hex::encode(&s.pub_key),
                    "signature": hex::encode(&s.signature),
                    "account_number": s.account_number,
                    "sequence": s.sequence,
                })
            })
            .collect();

        json!({
            "hash": self.hash().to_hex(),
            "msgs": self.msgs.iter().map(|m| m.to_json(network)).collect::<Vec<_>>(),
            "signatures": signatures,
            "memo": self.memo,
            "source": self.source,
            "data": hex::encode(&self.data),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airdrop_types::{AccAddress, Amount, PrivateKey, Transfer};

    fn send() -> SendMsg {
        let from = PrivateKey::from_bytes(&[1u8; 32])
            .unwrap()
            .public_key()
            .address();
        let to = AccAddress::from_slice(&[0u8; 20]).unwrap();
        SendMsg::from_transfers(
            from,
            &[Transfer::single(
                to,
                "BNB",
                Amount::from_base_units(100_000_000).unwrap(),
            )],
        )
        .unwrap()
    }

    #[test]
    fn test_sign_doc_is_canonical() {
        let msg = StdSignMsg {
            chain_id: "Binance-Chain-Ganges".to_string(),
            account_number: 12,
            sequence: 3,
            memo: "airdrop".to_string(),
            source: 0,
            msgs: vec![send()],
        };

        let expected = concat!(
            r#"{"account_number":"12","chain_id":"Binance-Chain-Ganges","data":null,"memo":"airdrop","#,
            r#""msgs":[{"inputs":[{"address":"tbnb10xcqpzrky6eff2g52qdye53xkk9jxkvrd3v5pu","#,
            r#""coins":[{"amount":100000000,"denom":"BNB"}]}],"#,
            r#""outputs":[{"address":"tbnb1qqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqljkhxz","#,
            r#""coins":[{"amount":100000000,"denom":"BNB"}]}]}],"#,
            r#""sequence":"3","source":"0"}"#
        );
        assert_eq!(String::from_utf8(msg.sign_bytes(Network::Test)).unwrap(), expected);
    }

    #[test]
    fn test_sign_doc_escapes_html_characters() {
        let msg = StdSignMsg {
            chain_id: "Binance-Chain-Ganges".to_string(),
            account_number: 12,
            sequence: 3,
            memo: "a&b<c>\u{2028}".to_string(),
            source: 0,
            msgs: vec![send()],
        };

        let doc = String::from_utf8(msg.sign_bytes(Network::Test)).unwrap();
        assert!(doc.contains(r#""memo":"a\u0026b\u003cc\u003e\u2028""#), "{doc}");
        assert!(!doc.contains('&'));

        // Still valid JSON that decodes back to the original memo.
        let value: serde_json::Value = serde_json::from_str(&doc).unwrap();
        assert_eq!(value["memo"], "a&b<c>\u{2028}");
    }

    #[test]
    fn test_unknown_msg_json() {
        let msg = Msg::Unknown {
            prefix: [0xCE, 0x6D, 0xC0, 0x43],
            body: vec![1, 2],
        };
        let value = msg.to_json(Network::Prod);
        assert_eq!(value["unknown"]["prefix"], "ce6dc043");
        assert_eq!(value["unknown"]["body"], "0102");
    }

    #[test]
    fn test_tx_json_uses_network_prefix() {
        let tx = StdTx {
            msgs: vec![Msg::Send(send())],
            memo: "hi".to_string(),
            ..Default::default()
        };
        let value = tx.to_json(Network::Prod);
        let address = value["msgs"][0]["send"]["outputs"][0]["address"]
            .as_str()
            .unwrap();
        assert!(address.starts_with("bnb1"));
        assert_eq!(value["memo"], "hi");
    }
}
