//! Transaction messages.

use airdrop_types::{AccAddress, Coin, Coins, Transfer};

use crate::amino::{expect_wire, Decoder, Encoder, WireType};
use crate::CodecError;

/// Type prefix of the token send message.
pub const SEND_MSG_PREFIX: [u8; 4] = [0x2A, 0x2C, 0x87, 0xFA];

/// An address together with the coins it sends or receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountCoins {
    pub address: AccAddress,
    pub coins: Vec<Coin>,
}

/// Sending side of a [`SendMsg`].
pub type Input = AccountCoins;
/// Receiving side of a [`SendMsg`].
pub type Output = AccountCoins;

/// Multi-send message: inputs and outputs must balance per denomination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMsg {
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
}

impl SendMsg {
    /// Build a send from one sender to every transfer's recipient.
    ///
    /// The single input carries the per-denomination sum of all outputs.
    pub fn from_transfers(from: AccAddress, transfers: &[Transfer]) -> Result<Self, CodecError> {
        let total = Coins::new(
            transfers
                .iter()
                .flat_map(|t| t.coins.iter().cloned()),
        )
        .ok_or(CodecError::CoinOverflow)?;

        let outputs = transfers
            .iter()
            .map(|t| AccountCoins {
                address: t.to,
                coins: t.coins.as_slice().to_vec(),
            })
            .collect();

        Ok(Self {
            inputs: vec![AccountCoins {
                address: from,
                coins: total.into_vec(),
            }],
            outputs,
        })
    }

    /// Amount of `denom` received by all outputs.
    pub fn output_amount_of(&self, denom: &str) -> i64 {
        self.outputs
            .iter()
            .flat_map(|o| o.coins.iter())
            .filter(|c| c.denom == denom)
            .map(|c| c.amount)
            .sum()
    }

    /// Encode with the type prefix.
    pub fn encode(&self) -> Vec<u8> {
        let mut enc = Encoder::with_prefix(SEND_MSG_PREFIX);
        for input in &self.inputs {
            enc.message_field(1, &encode_account_coins(input));
        }
        for output in &self.outputs {
            enc.message_field(2, &encode_account_coins(output));
        }
        enc.finish()
    }

    /// Decode the body that follows the type prefix.
    pub fn decode_body(body: &[u8]) -> Result<Self, CodecError> {
        let mut dec = Decoder::new(body);
        let mut inputs = Vec::new();
        let mut outputs = Vec::new();

        while let Some((field, wire)) = dec.next_field()? {
            match field {
                1 => {
                    expect_wire(field, wire, WireType::Bytes)?;
                    inputs.push(decode_account_coins(dec.bytes()?)?);
                }
                2 => {
                    expect_wire(field, wire, WireType::Bytes)?;
                    outputs.push(decode_account_coins(dec.bytes()?)?);
                }
                _ => dec.skip(wire)?,
            }
        }

        Ok(Self { inputs, outputs })
    }
}

fn encode_coin(coin: &Coin) -> Vec<u8> {
    let mut enc = Encoder::new();
    enc.string_field(1, &coin.denom);
    enc.int64_field(2, coin.amount);
    enc.finish()
}

fn decode_coin(bytes: &[u8]) -> Result<Coin, CodecError> {
    let mut dec = Decoder::new(bytes);
    let mut coin = Coin::new("", 0);
    while let Some((field, wire)) = dec.next_field()? {
        match field {
            1 => {
                expect_wire(field, wire, WireType::Bytes)?;
                coin.denom = dec.string()?;
            }
            2 => {
                expect_wire(field, wire, WireType::Varint)?;
                coin.amount = dec.int64()?;
            }
            _ => dec.skip(wire)?,
        }
    }
    Ok(coin)
}

fn encode_account_coins(ac: &AccountCoins) -> Vec<u8> {
    let mut enc = Encoder::new();
    enc.bytes_field(1, ac.address.as_bytes());
    for coin in &ac.coins {
        enc.message_field(2, &encode_coin(coin));
    }
    enc.finish()
}

fn decode_account_coins(bytes: &[u8]) -> Result<AccountCoins, CodecError> {
    let mut dec = Decoder::new(bytes);
    let mut address = None;
    let mut coins = Vec::new();
    while let Some((field, wire)) = dec.next_field()? {
        match field {
            1 => {
                expect_wire(field, wire, WireType::Bytes)?;
                address = Some(AccAddress::from_slice(dec.bytes()?)?);
            }
            2 => {
                expect_wire(field, wire, WireType::Bytes)?;
                coins.push(decode_coin(dec.bytes()?)?);
            }
            _ => dec.skip(wire)?,
        }
    }
    let address = match address {
        Some(a) => a,
        None => AccAddress::from_slice(&[])?,
    };
    Ok(AccountCoins { address, coins })
}

/// A message carried by a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    Send(SendMsg),
    /// A message type this crate does not model.
    Unknown { prefix: [u8; 4], body: Vec<u8> },
}

impl Msg {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Msg::Send(send) => send.encode(),
            Msg::Unknown { prefix, body } => {
                let mut out = prefix.to_vec();
                out.extend_from_slice(body);
                out
            }
        }
    }

    /// Decode a prefixed message.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut dec = Decoder::new(bytes);
        let prefix = dec.prefix()?;
        let body = dec.take(dec.remaining())?;
        match prefix {
            SEND_MSG_PREFIX => Ok(Msg::Send(SendMsg::decode_body(body)?)),
            _ => Ok(Msg::Unknown {
                prefix,
                body: body.to_vec(),
            }),
        }
    }

    pub fn as_send(&self) -> Option<&SendMsg> {
        match self {
            Msg::Send(send) => Some(send),
            Msg::Unknown { .. } => None,
        }
    }
}
