//! secp256k1 keys and signatures.
//!
//! Signatures are ECDSA over SHA-256 of the message, serialized as the 64-byte
//! `r || s` form with a low S value, which is what the chain expects.

use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{SigningKey, VerifyingKey};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use std::fmt;

use crate::AccAddress;

/// A secp256k1 private key.
#[derive(Clone)]
pub struct PrivateKey(SigningKey);

impl PrivateKey {
    /// Generate a new random key from the OS RNG.
    pub fn generate() -> Self {
        Self(SigningKey::random(&mut rand::rngs::OsRng))
    }

    /// Load a key from its 32-byte scalar.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != 32 {
            return Err(CryptoError::InvalidKeyLength(bytes.len()));
        }
        SigningKey::from_slice(bytes)
            .map(Self)
            .map_err(|_| CryptoError::InvalidPrivateKey)
    }

    /// Load a key from hex.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s.trim()).map_err(|_| CryptoError::InvalidHex)?;
        Self::from_bytes(&bytes)
    }

    /// The 32-byte scalar.
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.0.to_bytes());
        out
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(*self.0.verifying_key())
    }

    /// Sign `message` (hashed with SHA-256 internally).
    pub fn sign(&self, message: &[u8]) -> Signature {
        let sig: k256::ecdsa::Signature = self.0.sign(message);
        let sig = sig.normalize_s().unwrap_or(sig);
        let mut out = [0u8; 64];
        out.copy_from_slice(&sig.to_bytes());
        Signature(out)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(..)")
    }
}

/// A compressed secp256k1 public key.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    /// Size of the compressed SEC1 encoding.
    pub const BYTES: usize = 33;

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        VerifyingKey::from_sec1_bytes(bytes)
            .map(Self)
            .map_err(|_| CryptoError::InvalidPublicKey)
    }

    /// Compressed SEC1 bytes.
    pub fn to_bytes(&self) -> [u8; 33] {
        let point = self.0.to_encoded_point(true);
        let mut out = [0u8; 33];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// Account address controlled by this key.
    pub fn address(&self) -> AccAddress {
        let sha = Sha256::digest(self.to_bytes());
        let ripe = Ripemd160::digest(sha);
        // RIPEMD-160 output is always 20 bytes
        AccAddress::from_slice(&ripe).expect("ripemd160 digest is 20 bytes")
    }

    /// Verify a signature produced by [`PrivateKey::sign`].
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        match k256::ecdsa::Signature::from_slice(&signature.0) {
            Ok(sig) => self.0.verify(message, &sig).is_ok(),
            Err(_) => false,
        }
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.to_bytes()))
    }
}

/// A 64-byte `r || s` signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; 64]);

impl Signature {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; 64] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidSignatureLength(bytes.len()))?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", hex::encode(self.0))
    }
}

/// Key and signature errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    #[error("Invalid private key length: expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("Invalid private key")]
    InvalidPrivateKey,

    #[error("Invalid public key")]
    InvalidPublicKey,

    #[error("Invalid signature length: expected 64 bytes, got {0}")]
    InvalidSignatureLength(usize),

    #[error("Invalid hex")]
    InvalidHex,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Network;

    fn fixed_key() -> PrivateKey {
        PrivateKey::from_bytes(&[1u8; 32]).unwrap()
    }

    #[test]
    fn test_known_public_key_and_address() {
        let key = fixed_key();
        let pk = key.public_key();
        assert_eq!(
            hex::encode(pk.to_bytes()),
            "031b84c5567b126440995d3ed5aaba0565d71e1834604819ff9c17f5e9d5dd078f"
        );
        assert_eq!(
            pk.address().to_bech32(Network::Test),
            "tbnb10xcqpzrky6eff2g52qdye53xkk9jxkvrd3v5pu"
        );
    }

    #[test]
    fn test_sign_and_verify() {
        let key = fixed_key();
        let sig = key.sign(b"Testing");
        assert!(key.public_key().verify(b"Testing", &sig));
        assert!(!key.public_key().verify(b"Tampered", &sig));

        let other = PrivateKey::generate();
        assert!(!other.public_key().verify(b"Testing", &sig));
    }

    #[test]
    fn test_signature_is_low_s() {
        // Upper half of the curve order begins at 0x7FFFFFFF...5D576E73...
        let key = fixed_key();
        for msg in [b"a", b"b", b"c", b"d"] {
            let sig = key.sign(msg);
            assert!(sig.as_bytes()[32] <= 0x7F, "S must be in the lower half");
        }
    }

    #[test]
    fn test_hex_round_trip() {
        let key = fixed_key();
        let restored = PrivateKey::from_hex(&key.to_hex()).unwrap();
        assert_eq!(restored.to_bytes(), key.to_bytes());
    }

    #[test]
    fn test_invalid_inputs() {
        assert_eq!(
            PrivateKey::from_bytes(&[0u8; 31]).unwrap_err(),
            CryptoError::InvalidKeyLength(31)
        );
        // Zero is not a valid scalar
        assert_eq!(
            PrivateKey::from_bytes(&[0u8; 32]).unwrap_err(),
            CryptoError::InvalidPrivateKey
        );
        assert!(PublicKey::from_bytes(&[0u8; 33]).is_err());
        assert!(Signature::from_bytes(&[0u8; 63]).is_err());
    }
}
