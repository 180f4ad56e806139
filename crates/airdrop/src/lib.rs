//! Batch token airdrops and transaction inspection.
//!
//! # Modules
//!
//! - [`recipients`]: parse the address → amount JSON map
//! - [`sender`]: send one transfer per recipient with a fixed pause
//! - [`inspect`]: fetch and decode a transaction by hash
//! - [`watch`]: decode committed transactions from a live subscription
//! - [`config`]: TOML configuration for the `airdrop` binary

pub mod config;
pub mod inspect;
pub mod recipients;
pub mod sender;
pub mod watch;

mod error;

pub use config::{AirdropConfig, ConfigError};
pub use error::AirdropError;
pub use inspect::{describe_first_msg, inspect_tx, TxDetail};
pub use recipients::{load_recipients, parse_recipients, Recipient};
pub use sender::{
    AirdropReport, BatchConfig, BatchSender, RecipientOutcome, SendOutcome, TokenSender,
};
pub use watch::{watch, WatchConfig, WatchReport};
