//! TOML configuration.
//!
//! Every section is optional; a missing file section falls back to the
//! defaults below and CLI flags override whatever was loaded.
//!
//! ```toml
//! network = "test"
//!
//! [keystore]
//! path = "./keys/airdrop-ks.json"
//!
//! [endpoints]
//! dex_url = "https://testnet-dex.binance.org"
//! node_url = "tcp://seed-pre-s3.binance.org:80"
//!
//! [transfer]
//! denom = "IRIS-D88"
//! memo = "airdrop from irisnet ama"
//! interval_ms = 1000
//! sync = true
//! ```

use airdrop_types::Network;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::sender::BatchConfig;

/// Longest memo the chain accepts, in bytes.
pub const MAX_MEMO_BYTES: usize = 128;

/// Environment variable consulted for the keystore passphrase.
pub const PASSPHRASE_ENV: &str = "AIRDROP_KEYSTORE_PASSPHRASE";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AirdropConfig {
    #[serde(default)]
    pub network: Network,

    #[serde(default)]
    pub keystore: KeystoreConfig,

    #[serde(default)]
    pub endpoints: EndpointsConfig,

    #[serde(default)]
    pub transfer: TransferConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeystoreConfig {
    #[serde(default = "default_keystore_path")]
    pub path: PathBuf,

    /// Usually left unset and supplied through the environment.
    #[serde(default)]
    pub passphrase: Option<String>,
}

impl Default for KeystoreConfig {
    fn default() -> Self {
        Self {
            path: default_keystore_path(),
            passphrase: None,
        }
    }
}

fn default_keystore_path() -> PathBuf {
    PathBuf::from("./keystore.json")
}

/// Endpoint overrides; unset endpoints use the network's defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndpointsConfig {
    #[serde(default)]
    pub dex_url: Option<String>,

    #[serde(default)]
    pub node_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferConfig {
    #[serde(default)]
    pub denom: String,

    #[serde(default)]
    pub memo: String,

    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "default_sync")]
    pub sync: bool,

    #[serde(default)]
    pub dry_run: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            denom: String::new(),
            memo: String::new(),
            interval_ms: default_interval_ms(),
            sync: default_sync(),
            dry_run: false,
        }
    }
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_sync() -> bool {
    true
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Transfer denom is empty")]
    EmptyDenom,

    #[error("Keystore passphrase is missing (set {} or --passphrase)", PASSPHRASE_ENV)]
    MissingPassphrase,

    #[error("Memo is {len} bytes, limit is {}", MAX_MEMO_BYTES)]
    MemoTooLong { len: usize },

    #[error("Invalid {field} URL: {url}")]
    InvalidUrl { field: &'static str, url: String },
}

impl AirdropConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Check settings shared by every command.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let memo_len = self.transfer.memo.len();
        if memo_len > MAX_MEMO_BYTES {
            return Err(ConfigError::MemoTooLong { len: memo_len });
        }
        check_url("dex", &self.dex_url())?;
        check_url("node", &self.node_url())?;
        Ok(())
    }

    /// `validate` plus the settings a send needs.
    pub fn validate_for_send(&self) -> Result<(), ConfigError> {
        self.validate()?;
        if self.transfer.denom.trim().is_empty() {
            return Err(ConfigError::EmptyDenom);
        }
        Ok(())
    }

    /// Configured passphrase; empty counts as missing.
    pub fn passphrase(&self) -> Result<&str, ConfigError> {
        match self.keystore.passphrase.as_deref() {
            Some(p) if !p.is_empty() => Ok(p),
            _ => Err(ConfigError::MissingPassphrase),
        }
    }

    pub fn dex_url(&self) -> String {
        self.endpoints
            .dex_url
            .clone()
            .unwrap_or_else(|| self.network.default_dex_url().to_string())
    }

    pub fn node_url(&self) -> String {
        self.endpoints
            .node_url
            .clone()
            .unwrap_or_else(|| self.network.default_node_url().to_string())
    }

    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            network: self.network,
            denom: self.transfer.denom.clone(),
            memo: self.transfer.memo.clone(),
            interval: Duration::from_millis(self.transfer.interval_ms),
            sync: self.transfer.sync,
            dry_run: self.transfer.dry_run,
        }
    }
}

/// Accepts `http`, `https` and `tcp` URLs, or a bare host.
fn check_url(field: &'static str, url: &str) -> Result<(), ConfigError> {
    let invalid = || ConfigError::InvalidUrl {
        field,
        url: url.to_string(),
    };
    let host = match url.split_once("://") {
        Some(("http" | "https" | "tcp", host)) => host,
        Some(_) => return Err(invalid()),
        None => url,
    };
    let host = host.trim_end_matches('/');
    if host.is_empty() || host.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    Ok(())
}
