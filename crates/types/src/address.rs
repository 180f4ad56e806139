//! Account addresses.

use bech32::{FromBase32, ToBase32, Variant};
use std::fmt;

use crate::Network;

/// A 20-byte account address.
///
/// The raw bytes are `RIPEMD160(SHA256(compressed_pubkey))`. The text form is
/// bech32 with a network-specific prefix, so rendering an address always needs
/// a [`Network`] (or a raw prefix).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccAddress([u8; 20]);

impl AccAddress {
    /// Size of an address in bytes.
    pub const BYTES: usize = 20;

    /// Create an address from exactly 20 raw bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AddressError> {
        let arr: [u8; 20] = bytes
            .try_into()
            .map_err(|_| AddressError::InvalidLength(bytes.len()))?;
        Ok(Self(arr))
    }

    /// Raw address bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Parse a bech32 address, requiring the prefix of `network`.
    pub fn from_bech32(s: &str, network: Network) -> Result<Self, AddressError> {
        Self::from_bech32_with_prefix(s, network.address_prefix())
    }

    /// Parse a bech32 address, requiring the given human-readable prefix.
    pub fn from_bech32_with_prefix(s: &str, expected_prefix: &str) -> Result<Self, AddressError> {
        let (prefix, data, variant) =
            bech32::decode(s).map_err(|e| AddressError::Bech32(e.to_string()))?;

        if variant != Variant::Bech32 {
            return Err(AddressError::Bech32("bech32m variant not allowed".to_string()));
        }

        if prefix != expected_prefix {
            return Err(AddressError::WrongPrefix {
                expected: expected_prefix.to_string(),
                actual: prefix,
            });
        }

        let bytes =
            Vec::<u8>::from_base32(&data).map_err(|e| AddressError::Bech32(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Render as bech32 for `network`.
    pub fn to_bech32(&self, network: Network) -> String {
        self.to_bech32_with_prefix(network.address_prefix())
    }

    /// Render as bech32 with an arbitrary prefix.
    pub fn to_bech32_with_prefix(&self, prefix: &str) -> String {
        // Only fails for invalid prefixes; ours are static lowercase ASCII.
        bech32::encode(prefix, self.0.to_base32(), Variant::Bech32)
            .unwrap_or_else(|_| format!("{}1{}", prefix, hex::encode(self.0)))
    }
}

impl fmt::Debug for AccAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccAddress({})", hex::encode(self.0))
    }
}

/// Errors parsing account addresses.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("Invalid bech32: {0}")]
    Bech32(String),

    #[error("Wrong address prefix: expected {expected}, got {actual}")]
    WrongPrefix { expected: String, actual: String },

    #[error("Invalid address length: expected 20 bytes, got {0}")]
    InvalidLength(usize),
}
