//! Transaction hash type using SHA-256.

use sha2::{Digest, Sha256};
use std::fmt;

/// A 32-byte transaction hash.
///
/// Computed as SHA-256 over the exact bytes submitted to the node. Rendered as
/// upper-case hex, which is how nodes and explorers print it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxHash([u8; 32]);

impl TxHash {
    /// Size of hash in bytes.
    pub const BYTES: usize = 32;

    /// Hash transaction bytes.
    pub fn of(tx_bytes: &[u8]) -> Self {
        Self(Sha256::digest(tx_bytes).into())
    }

    /// Wrap raw hash bytes (without hashing).
    pub fn from_raw(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse hash from hex string (either case, optional `0x`).
    pub fn from_hex(hex: &str) -> Result<Self, HashError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        if hex.len() != 64 {
            return Err(HashError::InvalidLength {
                expected: 64,
                actual: hex.len(),
            });
        }

        let mut bytes = [0u8; 32];
        hex::decode_to_slice(hex, &mut bytes).map_err(|_| HashError::InvalidHex)?;

        Ok(Self(bytes))
    }

    /// Upper-case hex string.
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", &self.to_hex()[..16])
    }
}

/// Errors parsing a hash from hex.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HashError {
    #[error("Invalid hex length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Invalid hex characters")]
    InvalidHex,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_round_trip_is_upper_case() {
        let hash = TxHash::from_hex(
            "f9ae66ec24e9d90394cb87ae4d19d98a67f3062139f63f1ef45fed140cb631b1",
        )
        .unwrap();
        assert_eq!(
            hash.to_string(),
            "F9AE66EC24E9D90394CB87AE4D19D98A67F3062139F63F1EF45FED140CB631B1"
        );
    }

    #[test]
    fn test_of_matches_sha256() {
        // SHA-256("abc")
        assert_eq!(
            TxHash::of(b"abc").to_hex(),
            "BA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD"
        );
    }

    #[test]
    fn test_rejects_bad_input() {
        assert_eq!(
            TxHash::from_hex("abcd"),
            Err(HashError::InvalidLength {
                expected: 64,
                actual: 4
            })
        );
        assert_eq!(TxHash::from_hex(&"zz".repeat(32)), Err(HashError::InvalidHex));
        assert!(TxHash::from_hex(&format!("0x{}", "00".repeat(32))).is_ok());
    }
}
