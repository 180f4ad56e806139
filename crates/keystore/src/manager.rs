//! Unlocked key bound to a network.

use airdrop_types::{AccAddress, Network, PrivateKey, PublicKey, Signature};
use std::path::Path;
use tracing::info;

use crate::{KeyStore, KeystoreError};

/// Holds an unlocked private key and the address it controls.
#[derive(Debug, Clone)]
pub struct KeyManager {
    key: PrivateKey,
    address: AccAddress,
    network: Network,
}

impl KeyManager {
    /// Wrap an already-unlocked key.
    pub fn from_private_key(key: PrivateKey, network: Network) -> Self {
        let address = key.public_key().address();
        Self {
            key,
            address,
            network,
        }
    }

    /// Load and unlock a keystore file.
    pub fn from_keystore_file(
        path: impl AsRef<Path>,
        passphrase: &str,
        network: Network,
    ) -> Result<Self, KeystoreError> {
        let keystore = KeyStore::from_file(path)?;
        Self::from_keystore(&keystore, passphrase, network)
    }

    /// Unlock a keystore and check its recorded address, if any.
    ///
    /// The recorded address is compared by raw bytes, so a keystore written
    /// for one network can be used on the other.
    pub fn from_keystore(
        keystore: &KeyStore,
        passphrase: &str,
        network: Network,
    ) -> Result<Self, KeystoreError> {
        let key = keystore.decrypt(passphrase)?;
        let manager = Self::from_private_key(key, network);

        if !keystore.address.is_empty() {
            let stored = keystore
                .address
                .rsplit_once('1')
                .and_then(|(prefix, _)| {
                    AccAddress::from_bech32_with_prefix(&keystore.address, prefix).ok()
                });
            if stored != Some(manager.address) {
                return Err(KeystoreError::AddressMismatch {
                    stored: keystore.address.clone(),
                    derived: manager.address_string(),
                });
            }
        }

        info!(address = %manager.address_string(), "Unlocked keystore");
        Ok(manager)
    }

    pub fn address(&self) -> AccAddress {
        self.address
    }

    /// Address rendered for the manager's network.
    pub fn address_string(&self) -> String {
        self.address.to_bech32(self.network)
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn public_key(&self) -> PublicKey {
        self.key.public_key()
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.key
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        self.key.sign(message)
    }

    /// Raw private key as hex.
    pub fn export_private_key(&self) -> String {
        self.key.to_hex()
    }
}
