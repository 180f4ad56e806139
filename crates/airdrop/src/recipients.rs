//! Recipient list parsing.
//!
//! The input is a JSON object mapping bech32 addresses to token amounts:
//!
//! ```json
//! {"tbnb1...": 344.74, "tbnb1...": 1292.77}
//! ```
//!
//! Amounts are read from the number's text, so `344.74` becomes exactly
//! `34474000000` base units. Recipients come back ordered by address.

use airdrop_types::{AccAddress, Amount, Network, Transfer};
use serde_json::value::RawValue;
use std::collections::BTreeMap;
use std::path::Path;

use crate::AirdropError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub address: AccAddress,
    pub amount: Amount,
}

impl Recipient {
    pub fn transfer(&self, denom: &str) -> Transfer {
        Transfer::single(self.address, denom, self.amount)
    }
}

/// Parse a recipient map. Empty or whitespace-only input yields no recipients.
///
/// Any malformed address or amount fails the whole list.
pub fn parse_recipients(json: &str, network: Network) -> Result<Vec<Recipient>, AirdropError> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }

    let raw: BTreeMap<String, Box<RawValue>> =
        serde_json::from_str(json).map_err(AirdropError::RecipientsJson)?;

    raw.into_iter()
        .map(|(address, amount)| {
            let parsed = AccAddress::from_bech32(&address, network).map_err(|source| {
                AirdropError::InvalidAddress {
                    address: address.clone(),
                    source,
                }
            })?;
            // Accept both `1.5` and `"1.5"`.
            let text = amount.get().trim().trim_matches('"');
            let amount = Amount::from_decimal_str(text)
                .map_err(|source| AirdropError::InvalidAmount { address, source })?;
            Ok(Recipient {
                address: parsed,
                amount,
            })
        })
        .collect()
}

pub fn load_recipients(
    path: impl AsRef<Path>,
    network: Network,
) -> Result<Vec<Recipient>, AirdropError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|source| AirdropError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_recipients(&json, network)
}
