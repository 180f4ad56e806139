//! Network selection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The chain a client is bound to.
///
/// The network decides the bech32 prefix of account addresses, which means an
/// address parsed for one network is rejected by the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Public test network.
    #[default]
    Test,
    /// Production network.
    Prod,
}

impl Network {
    /// Bech32 human-readable prefix for account addresses.
    pub fn address_prefix(&self) -> &'static str {
        match self {
            Network::Test => "tbnb",
            Network::Prod => "bnb",
        }
    }

    /// Default DEX HTTP API base URL.
    pub fn default_dex_url(&self) -> &'static str {
        match self {
            Network::Test => "https://testnet-dex.binance.org",
            Network::Prod => "https://dex.binance.org",
        }
    }

    /// Default node RPC address.
    pub fn default_node_url(&self) -> &'static str {
        match self {
            Network::Test => "tcp://seed-pre-s3.binance.org:80",
            Network::Prod => "tcp://dataseed1.ninicoin.io:80",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Test => write!(f, "test"),
            Network::Prod => write!(f, "prod"),
        }
    }
}

/// Error returned when a network name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown network: {0} (expected test or prod)")]
pub struct NetworkParseError(pub String);

impl FromStr for Network {
    type Err = NetworkParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "test" | "testnet" => Ok(Network::Test),
            "prod" | "mainnet" => Ok(Network::Prod),
            _ => Err(NetworkParseError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("test".parse::<Network>().unwrap(), Network::Test);
        assert_eq!("TestNet".parse::<Network>().unwrap(), Network::Test);
        assert_eq!("prod".parse::<Network>().unwrap(), Network::Prod);
        assert_eq!("mainnet".parse::<Network>().unwrap(), Network::Prod);
        assert!("devnet".parse::<Network>().is_err());
    }

    #[test]
    fn test_prefixes_differ() {
        assert_eq!(Network::Test.address_prefix(), "tbnb");
        assert_eq!(Network::Prod.address_prefix(), "bnb");
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Network::Prod).unwrap();
        assert_eq!(json, "\"prod\"");
        let parsed: Network = serde_json::from_str("\"test\"").unwrap();
        assert_eq!(parsed, Network::Test);
    }
}
