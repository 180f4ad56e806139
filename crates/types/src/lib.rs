//! Core types for the airdrop tool.
//!
//! This crate provides the foundational types shared by every other crate in
//! the workspace:
//!
//! - **Network**: test/prod selector with bech32 prefixes and default endpoints
//! - **Addresses**: 20-byte account addresses and their bech32 text form
//! - **Coins**: fixed-point token amounts, denominations and transfers
//! - **Primitives**: transaction hashes and secp256k1 keys
//!
//! # Design Philosophy
//!
//! This crate does not depend on any other workspace crate. Wire encoding lives
//! in `airdrop-codec`, which builds on these types.

mod address;
mod coin;
mod crypto;
mod hash;
mod network;

pub use address::{AccAddress, AddressError};
pub use coin::{Amount, AmountError, Coin, Coins, Transfer, DECIMALS};
pub use crypto::{CryptoError, PrivateKey, PublicKey, Signature};
pub use hash::{HashError, TxHash};
pub use network::{Network, NetworkParseError};
