//! Standard transactions and their signing.

use airdrop_types::{Network, PrivateKey, PublicKey, TxHash};
use tracing::trace;

use crate::amino::{expect_wire, length_prefixed, Decoder, Encoder, WireType};
use crate::json::StdSignDoc;
use crate::msg::{Msg, SendMsg};
use crate::CodecError;

/// Type prefix of a standard transaction.
pub const STD_TX_PREFIX: [u8; 4] = [0xF0, 0x62, 0x5D, 0xEE];

/// Type prefix of a compressed secp256k1 public key.
pub const PUBKEY_SECP256K1_PREFIX: [u8; 4] = [0xEB, 0x5A, 0xE9, 0x87];

/// A signature with the signer's account metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StdSignature {
    /// Compressed secp256k1 public key (33 bytes).
    pub pub_key: Vec<u8>,
    pub signature: Vec<u8>,
    pub account_number: i64,
    pub sequence: i64,
}

impl StdSignature {
    fn encode(&self) -> Vec<u8> {
        let mut key = Encoder::with_prefix(PUBKEY_SECP256K1_PREFIX);
        key.uvarint(self.pub_key.len() as u64);
        let mut key = key.finish();
        key.extend_from_slice(&self.pub_key);

        let mut enc = Encoder::new();
        enc.bytes_field(1, &key);
        enc.bytes_field(2, &self.signature);
        enc.int64_field(3, self.account_number);
        enc.int64_field(4, self.sequence);
        enc.finish()
    }

    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut dec = Decoder::new(bytes);
        let mut sig = StdSignature {
            pub_key: Vec::new(),
            signature: Vec::new(),
            account_number: 0,
            sequence: 0,
        };

        while let Some((field, wire)) = dec.next_field()? {
            match field {
                1 => {
                    expect_wire(field, wire, WireType::Bytes)?;
                    let mut key = Decoder::new(dec.bytes()?);
                    let prefix = key.prefix()?;
                    if prefix != PUBKEY_SECP256K1_PREFIX {
                        return Err(CodecError::UnsupportedPubKey(hex::encode(prefix)));
                    }
                    sig.pub_key = key.bytes()?.to_vec();
                }
                2 => {
                    expect_wire(field, wire, WireType::Bytes)?;
                    sig.signature = dec.bytes()?.to_vec();
                }
                3 => {
                    expect_wire(field, wire, WireType::Varint)?;
                    sig.account_number = dec.int64()?;
                }
                4 => {
                    expect_wire(field, wire, WireType::Varint)?;
                    sig.sequence = dec.int64()?;
                }
                _ => dec.skip(wire)?,
            }
        }

        Ok(sig)
    }
}

/// A signed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StdTx {
    pub msgs: Vec<Msg>,
    pub signatures: Vec<StdSignature>,
    pub memo: String,
    pub source: i64,
    pub data: Vec<u8>,
}

impl StdTx {
    /// Encode with the type prefix but without a length prefix.
    pub fn encode(&self) -> Vec<u8> {
        let mut enc = Encoder::with_prefix(STD_TX_PREFIX);
        for msg in &self.msgs {
            enc.message_field(1, &msg.encode());
        }
        for sig in &self.signatures {
            enc.message_field(2, &sig.encode());
        }
        enc.string_field(3, &self.memo);
        enc.int64_field(4, self.source);
        enc.bytes_field(5, &self.data);
        enc.finish()
    }

    /// Encode in the form submitted for broadcast: `uvarint(len) || tx`.
    pub fn encode_for_broadcast(&self) -> Vec<u8> {
        length_prefixed(&self.encode())
    }

    /// Hash of the broadcast encoding, as reported by the node.
    pub fn hash(&self) -> TxHash {
        TxHash::of(&self.encode_for_broadcast())
    }

    /// Decode a transaction, with or without the length prefix.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let body = strip_length_prefix(bytes)?;

        let mut dec = Decoder::new(body);
        let prefix = dec.prefix()?;
        if prefix != STD_TX_PREFIX {
            return Err(CodecError::UnknownTxStructure(hex::encode(prefix)));
        }

        let mut tx = StdTx::default();
        while let Some((field, wire)) = dec.next_field()? {
            match field {
                1 => {
                    expect_wire(field, wire, WireType::Bytes)?;
                    tx.msgs.push(Msg::decode(dec.bytes()?)?);
                }
                2 => {
                    expect_wire(field, wire, WireType::Bytes)?;
                    tx.signatures.push(StdSignature::decode(dec.bytes()?)?);
                }
                3 => {
                    expect_wire(field, wire, WireType::Bytes)?;
                    tx.memo = dec.string()?;
                }
                4 => {
                    expect_wire(field, wire, WireType::Varint)?;
                    tx.source = dec.int64()?;
                }
                5 => {
                    expect_wire(field, wire, WireType::Bytes)?;
                    tx.data = dec.bytes()?.to_vec();
                }
                _ => dec.skip(wire)?,
            }
        }

        trace!(msgs = tx.msgs.len(), sigs = tx.signatures.len(), "Decoded tx");
        Ok(tx)
    }

    /// First message, if any.
    pub fn first_msg(&self) -> Option<&Msg> {
        self.msgs.first()
    }
}

/// Strip `uvarint(len)` when it exactly covers the rest of the input.
fn strip_length_prefix(bytes: &[u8]) -> Result<&[u8], CodecError> {
    if bytes.starts_with(&STD_TX_PREFIX) {
        return Ok(bytes);
    }

    let mut dec = Decoder::new(bytes);
    let len = dec.uvarint()? as usize;
    let rest = dec.take(dec.remaining())?;
    if len > rest.len() {
        return Err(CodecError::Truncated);
    }
    if len < rest.len() {
        return Err(CodecError::TrailingBytes(rest.len() - len));
    }
    Ok(rest)
}

/// Everything needed to sign a transfer transaction.
#[derive(Debug, Clone)]
pub struct StdSignMsg {
    pub chain_id: String,
    pub account_number: i64,
    pub sequence: i64,
    pub memo: String,
    pub source: i64,
    pub msgs: Vec<SendMsg>,
}

impl StdSignMsg {
    /// Canonical JSON bytes that get signed.
    pub fn sign_bytes(&self, network: Network) -> Vec<u8> {
        StdSignDoc::new(self, network).to_bytes()
    }

    /// Sign and assemble the transaction.
    pub fn sign(self, key: &PrivateKey, network: Network) -> StdTx {
        let signature = key.sign(&self.sign_bytes(network));
        let pub_key: PublicKey = key.public_key();

        StdTx {
            msgs: self.msgs.into_iter().map(Msg::Send).collect(),
            signatures: vec![StdSignature {
                pub_key: pub_key.to_bytes().to_vec(),
                signature: signature.as_bytes().to_vec(),
                account_number: self.account_number,
                sequence: self.sequence,
            }],
            memo: self.memo,
            source: self.source,
            data: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airdrop_types::{AccAddress, Amount, Signature, Transfer};

    fn key() -> PrivateKey {
        PrivateKey::from_bytes(&[1u8; 32]).unwrap()
    }

    fn sign_msg() -> StdSignMsg {
        let to = AccAddress::from_slice(&[0u8; 20]).unwrap();
        let send = SendMsg::from_transfers(
            key().public_key().address(),
            &[Transfer::single(
                to,
                "BNB",
                Amount::from_base_units(100_000_000).unwrap(),
            )],
        )
        .unwrap();
        StdSignMsg {
            chain_id: "Binance-Chain-Ganges".to_string(),
            account_number: 12,
            sequence: 3,
            memo: "airdrop".to_string(),
            source: 0,
            msgs: vec![send],
        }
    }

    #[test]
    fn test_signed_tx_decodes_back() {
        let tx = sign_msg().sign(&key(), Network::Test);
        let bytes = tx.encode_for_broadcast();
        let decoded = StdTx::decode(&bytes).unwrap();
        assert_eq!(decoded, tx);

        // Bare encoding decodes too
        assert_eq!(StdTx::decode(&tx.encode()).unwrap(), tx);
    }

    #[test]
    fn test_signature_verifies_over_sign_bytes() {
        let msg = sign_msg();
        let sign_bytes = msg.sign_bytes(Network::Test);
        let tx = msg.sign(&key(), Network::Test);

        let sig = &tx.signatures[0];
        assert_eq!(sig.pub_key.len(), 33);
        assert_eq!(sig.account_number, 12);
        assert_eq!(sig.sequence, 3);

        let pk = PublicKey::from_bytes(&sig.pub_key).unwrap();
        let signature = Signature::from_bytes(&sig.signature).unwrap();
        assert!(pk.verify(&sign_bytes, &signature));
    }

    #[test]
    fn test_pubkey_is_prefixed_with_length() {
        let tx = sign_msg().sign(&key(), Network::Test);
        let encoded = hex::encode(tx.encode());
        // prefix || 0x21 || compressed key
        assert!(encoded.contains(
            "eb5ae98721031b84c5567b126440995d3ed5aaba0565d71e1834604819ff9c17f5e9d5dd078f"
        ));
    }

    #[test]
    fn test_hash_covers_broadcast_bytes() {
        let tx = sign_msg().sign(&key(), Network::Test);
        assert_eq!(tx.hash(), TxHash::of(&tx.encode_for_broadcast()));
        assert_ne!(tx.hash(), TxHash::of(&tx.encode()));
    }

    #[test]
    fn test_unknown_structure() {
        let mut bytes = vec![0x01, 0x02, 0x03, 0x04];
        bytes.insert(0, 4);
        assert_eq!(
            StdTx::decode(&bytes),
            Err(CodecError::UnknownTxStructure("01020304".to_string()))
        );
    }

    #[test]
    fn test_length_prefix_mismatch() {
        let tx = sign_msg().sign(&key(), Network::Test);
        let mut bytes = tx.encode_for_broadcast();
        bytes.push(0);
        assert_eq!(StdTx::decode(&bytes), Err(CodecError::TrailingBytes(1)));

        let bytes = tx.encode_for_broadcast();
        assert_eq!(
            StdTx::decode(&bytes[..bytes.len() - 1]),
            Err(CodecError::Truncated)
        );
    }

    #[test]
    fn test_unsupported_pubkey_type() {
        let mut sig = Encoder::new();
        let mut key = Encoder::with_prefix([0x16, 0x24, 0xDE, 0x64]);
        key.uvarint(32);
        let mut key = key.finish();
        key.extend_from_slice(&[9u8; 32]);
        sig.bytes_field(1, &key);

        let mut tx = Encoder::with_prefix(STD_TX_PREFIX);
        tx.message_field(2, &sig.finish());
        assert_eq!(
            StdTx::decode(&tx.finish()),
            Err(CodecError::UnsupportedPubKey("1624de64".to_string()))
        );
    }
}
