//! Version 1 JSON keystore.
//!
//! ```json
//! {
//!   "address": "tbnb1...",
//!   "crypto": {
//!     "cipher": "aes-256-ctr",
//!     "ciphertext": "<hex>",
//!     "cipherparams": { "iv": "<hex, 16 bytes>" },
//!     "kdf": "pbkdf2",
//!     "kdfparams": { "c": 262144, "dklen": 32, "prf": "hmac-sha256", "salt": "<hex>" },
//!     "mac": "<hex>"
//!   },
//!   "id": "<uuid>",
//!   "version": 1
//! }
//! ```
//!
//! The derived key encrypts the private key with AES-256-CTR, and
//! `mac = Keccak-512(derived[16..32] || ciphertext)` authenticates it.

use aes::Aes256;
use airdrop_types::{Network, PrivateKey};
use ctr::cipher::{KeyIvInit, StreamCipher};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use sha3::{Digest, Keccak512};
use std::path::Path;
use tracing::debug;

use crate::KeystoreError;

type Aes256Ctr = ctr::Ctr128BE<Aes256>;

/// PBKDF2 iteration count used for new keystores.
pub const DEFAULT_KDF_ROUNDS: u32 = 262_144;

const CIPHER: &str = "aes-256-ctr";
const KDF: &str = "pbkdf2";
const PRF: &str = "hmac-sha256";
const DK_LEN: usize = 32;

/// A keystore file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyStore {
    #[serde(default)]
    pub address: String,
    #[serde(alias = "Crypto")]
    pub crypto: CryptoJson,
    #[serde(default)]
    pub id: String,
    /// Written as `1`; some producers write `"1"`.
    #[serde(default)]
    pub version: serde_json::Value,
}

/// Cipher and KDF section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptoJson {
    pub cipher: String,
    pub ciphertext: String,
    pub cipherparams: CipherParams,
    pub kdf: String,
    pub kdfparams: KdfParams,
    pub mac: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CipherParams {
    pub iv: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KdfParams {
    pub c: u32,
    pub dklen: usize,
    pub prf: String,
    pub salt: String,
}

impl KeyStore {
    /// Read a keystore file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, KeystoreError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| KeystoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self, KeystoreError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, KeystoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the keystore as pretty JSON.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), KeystoreError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json_pretty()?).map_err(|source| KeystoreError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Encrypt `key` with the default iteration count.
    pub fn encrypt(key: &PrivateKey, passphrase: &str, network: Network) -> Self {
        Self::encrypt_with_rounds(key, passphrase, network, DEFAULT_KDF_ROUNDS)
    }

    /// Encrypt `key` with an explicit PBKDF2 iteration count.
    pub fn encrypt_with_rounds(
        key: &PrivateKey,
        passphrase: &str,
        network: Network,
        rounds: u32,
    ) -> Self {
        let mut salt = [0u8; 32];
        let mut iv = [0u8; 16];
        rand::rngs::OsRng.fill_bytes(&mut salt);
        rand::rngs::OsRng.fill_bytes(&mut iv);

        let derived = derive_key(passphrase, &salt, rounds);
        let mut ciphertext = key.to_bytes().to_vec();
        apply_ctr(&derived, &iv, &mut ciphertext);
        let mac = compute_mac(&derived, &ciphertext);

        Self {
            address: key.public_key().address().to_bech32(network),
            crypto: CryptoJson {
                cipher: CIPHER.to_string(),
                ciphertext: hex::encode(&ciphertext),
                cipherparams: CipherParams {
                    iv: hex::encode(iv),
                },
                kdf: KDF.to_string(),
                kdfparams: KdfParams {
                    c: rounds,
                    dklen: DK_LEN,
                    prf: PRF.to_string(),
                    salt: hex::encode(salt),
                },
                mac: hex::encode(mac),
            },
            id: uuid::Uuid::new_v4().to_string(),
            version: serde_json::Value::from(1),
        }
    }

    /// Unlock the private key.
    ///
    /// The MAC is checked before decrypting, so a wrong passphrase is reported
    /// as [`KeystoreError::InvalidPassphrase`] rather than as a garbage key.
    pub fn decrypt(&self, passphrase: &str) -> Result<PrivateKey, KeystoreError> {
        let crypto = &self.crypto;

        if !crypto.cipher.eq_ignore_ascii_case(CIPHER) {
            return Err(KeystoreError::UnsupportedCipher(crypto.cipher.clone()));
        }
        if !crypto.kdf.eq_ignore_ascii_case(KDF) {
            return Err(KeystoreError::UnsupportedKdf(crypto.kdf.clone()));
        }

        let params = &crypto.kdfparams;
        if !params.prf.eq_ignore_ascii_case(PRF) {
            return Err(KeystoreError::UnsupportedPrf(params.prf.clone()));
        }
        if params.dklen != DK_LEN {
            return Err(KeystoreError::InvalidKdfParams(format!(
                "dklen must be {}, got {}",
                DK_LEN, params.dklen
            )));
        }
        if params.c == 0 {
            return Err(KeystoreError::InvalidKdfParams(
                "iteration count must be positive".to_string(),
            ));
        }

        let salt = hex::decode(&params.salt).map_err(|_| KeystoreError::InvalidHex("salt"))?;
        let iv = hex::decode(&crypto.cipherparams.iv)
            .map_err(|_| KeystoreError::InvalidHex("iv"))?;
        let mut ciphertext =
            hex::decode(&crypto.ciphertext).map_err(|_| KeystoreError::InvalidHex("ciphertext"))?;
        let mac = hex::decode(&crypto.mac).map_err(|_| KeystoreError::InvalidHex("mac"))?;

        if iv.len() != 16 {
            return Err(KeystoreError::InvalidKdfParams(format!(
                "iv must be 16 bytes, got {}",
                iv.len()
            )));
        }

        debug!(rounds = params.c, "Deriving keystore key");
        let derived = derive_key(passphrase, &salt, params.c);

        if !constant_time_eq(&compute_mac(&derived, &ciphertext), &mac) {
            return Err(KeystoreError::InvalidPassphrase);
        }

        apply_ctr(&derived, &iv, &mut ciphertext);
        Ok(PrivateKey::from_bytes(&ciphertext)?)
    }
}

fn derive_key(passphrase: &str, salt: &[u8], rounds: u32) -> [u8; DK_LEN] {
    let mut out = [0u8; DK_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, rounds, &mut out);
    out
}

fn compute_mac(derived: &[u8; DK_LEN], ciphertext: &[u8]) -> Vec<u8> {
    let mut hasher = Keccak512::new();
    hasher.update(&derived[16..32]);
    hasher.update(ciphertext);
    hasher.finalize().to_vec()
}

/// AES-256-CTR is symmetric; the same call encrypts and decrypts.
fn apply_ctr(derived: &[u8; DK_LEN], iv: &[u8], buf: &mut [u8]) {
    // Key is 32 bytes and iv is checked/generated as 16 bytes.
    if let Ok(mut cipher) = Aes256Ctr::new_from_slices(derived, iv) {
        cipher.apply_keystream(buf);
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    // Keep tests fast; the format is identical at any iteration count.
    const TEST_ROUNDS: u32 = 1024;

    fn key() -> PrivateKey {
        PrivateKey::from_bytes(&[1u8; 32]).unwrap()
    }

    #[test]
    fn test_encrypt_then_decrypt() {
        let ks = KeyStore::encrypt_with_rounds(&key(), "bd@Admin", Network::Test, TEST_ROUNDS);
        assert_eq!(ks.address, "tbnb10xcqpzrky6eff2g52qdye53xkk9jxkvrd3v5pu");
        assert_eq!(ks.crypto.kdfparams.c, TEST_ROUNDS);

        let restored = ks.decrypt("bd@Admin").unwrap();
        assert_eq!(restored.to_bytes(), key().to_bytes());
    }

    #[test]
    fn test_wrong_passphrase() {
        let ks = KeyStore::encrypt_with_rounds(&key(), "right", Network::Test, TEST_ROUNDS);
        assert!(matches!(
            ks.decrypt("wrong"),
            Err(KeystoreError::InvalidPassphrase)
        ));
    }

    #[test]
    fn test_json_round_trip_and_string_version() {
        let ks = KeyStore::encrypt_with_rounds(&key(), "pw", Network::Prod, TEST_ROUNDS);
        let json = ks.to_json_pretty().unwrap();
        assert!(json.contains("\"kdf\": \"pbkdf2\""));

        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["version"] = serde_json::Value::from("1");
        let reparsed = KeyStore::from_json(&value.to_string()).unwrap();
        assert_eq!(reparsed.decrypt("pw").unwrap().to_bytes(), key().to_bytes());
    }

    #[test]
    fn test_capitalized_crypto_section() {
        let ks = KeyStore::encrypt_with_rounds(&key(), "pw", Network::Test, TEST_ROUNDS);
        let json = serde_json::to_string(&ks).unwrap().replace("\"crypto\"", "\"Crypto\"");
        assert!(KeyStore::from_json(&json).unwrap().decrypt("pw").is_ok());
    }

    #[test]
    fn test_unsupported_parameters() {
        let base = KeyStore::encrypt_with_rounds(&key(), "pw", Network::Test, TEST_ROUNDS);

        let mut ks = base.clone();
        ks.crypto.cipher = "aes-128-cbc".to_string();
        assert!(matches!(
            ks.decrypt("pw"),
            Err(KeystoreError::UnsupportedCipher(_))
        ));

        let mut ks = base.clone();
        ks.crypto.kdf = "scrypt".to_string();
        assert!(matches!(ks.decrypt("pw"), Err(KeystoreError::UnsupportedKdf(_))));

        let mut ks = base.clone();
        ks.crypto.kdfparams.prf = "hmac-sha512".to_string();
        assert!(matches!(ks.decrypt("pw"), Err(KeystoreError::UnsupportedPrf(_))));

        let mut ks = base.clone();
        ks.crypto.kdfparams.dklen = 16;
        assert!(matches!(
            ks.decrypt("pw"),
            Err(KeystoreError::InvalidKdfParams(_))
        ));

        let mut ks = base;
        ks.crypto.mac = "not hex".to_string();
        assert!(matches!(ks.decrypt("pw"), Err(KeystoreError::InvalidHex("mac"))));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ks.json");
        KeyStore::encrypt_with_rounds(&key(), "pw", Network::Test, TEST_ROUNDS)
            .write_to(&path)
            .unwrap();

        let loaded = KeyStore::from_file(&path).unwrap();
        assert!(loaded.decrypt("pw").is_ok());

        assert!(matches!(
            KeyStore::from_file(dir.path().join("missing.json")),
            Err(KeystoreError::Io { .. })
        ));
    }
}
