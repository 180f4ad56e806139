//! Airdrop CLI
//!
//! Sends tokens to a list of recipients and inspects committed transactions.
//!
//! # Usage
//!
//! ```bash
//! # Send to every recipient in a JSON map, one transaction each
//! AIRDROP_KEYSTORE_PASSPHRASE=... airdrop --config airdrop.toml send recipients.json
//!
//! # Print the plan without broadcasting
//! airdrop --config airdrop.toml send recipients.json --dry-run
//!
//! # Fetch and decode a transaction
//! airdrop tx F9AE66EC24E9D90394CB87AE4D19D98A67F3062139F63F1EF45FED140CB631B1
//!
//! # Decode committed transactions for ten minutes
//! airdrop subscribe --query "tm.event = 'Tx'" --duration-secs 600
//!
//! # Check that a keystore unlocks
//! airdrop --keystore ./ks.json keystore verify
//! ```

use airdrop::{
    inspect_tx, load_recipients, watch, AirdropConfig, BatchSender, WatchConfig,
};
use airdrop_client::{DexClient, Query, RpcClient};
use airdrop_keystore::{KeyManager, KeyStore};
use airdrop_types::{Network, PrivateKey};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Batch token airdrops and transaction inspection.
#[derive(Parser, Debug)]
#[command(name = "airdrop")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Network: test or prod (overrides config)
    #[arg(long)]
    network: Option<Network>,

    /// Path to keystore file (overrides config)
    #[arg(long)]
    keystore: Option<PathBuf>,

    /// Keystore passphrase
    #[arg(long, env = "AIRDROP_KEYSTORE_PASSPHRASE", hide_env_values = true)]
    passphrase: Option<String>,

    /// DEX API URL (overrides config)
    #[arg(long)]
    dex_url: Option<String>,

    /// Node RPC URL (overrides config)
    #[arg(long)]
    node_url: Option<String>,

    /// Log level filter (overrides RUST_LOG)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Path to log file (redirects all logs to this file)
    #[arg(long)]
    logfile: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send tokens to every recipient in a JSON address → amount map
    Send {
        /// Recipient map file
        recipients: PathBuf,

        /// Token denomination (overrides config)
        #[arg(long)]
        denom: Option<String>,

        /// Memo attached to every transaction (overrides config)
        #[arg(long)]
        memo: Option<String>,

        /// Pause after each send in milliseconds (overrides config)
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Return as soon as the DEX accepts the broadcast
        #[arg(long)]
        no_sync: bool,

        /// Print the plan without sending
        #[arg(long)]
        dry_run: bool,
    },

    /// Fetch a transaction by hash and decode it
    Tx {
        /// Transaction hash (64 hex characters)
        hash: String,
    },

    /// Subscribe to events and decode committed transactions
    Subscribe {
        /// Event query
        #[arg(long, default_value = "tm.event = 'Tx'")]
        query: String,

        /// Only transactions paying this address (replaces --query)
        #[arg(long)]
        recipient: Option<String>,

        /// Events buffered before the reader waits
        #[arg(long, default_value_t = airdrop::watch::DEFAULT_CAPACITY)]
        capacity: usize,

        /// Stop after this many seconds (0 runs until Ctrl+C)
        #[arg(long, default_value_t = 600)]
        duration_secs: u64,
    },

    /// Keystore utilities
    Keystore {
        #[command(subcommand)]
        action: KeystoreCommand,
    },
}

#[derive(Subcommand, Debug)]
enum KeystoreCommand {
    /// Unlock the keystore, sign a check message and print the address
    Verify,

    /// Print the raw private key as hex
    Export,

    /// Generate a new key and write it to the keystore path
    New {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Message signed by `keystore verify`.
const CHECK_MESSAGE: &[u8] = b"airdrop keystore check";

fn load_config(cli: &Cli) -> Result<AirdropConfig> {
    let mut config = match &cli.config {
        Some(path) => AirdropConfig::load(path)?,
        None => AirdropConfig::default(),
    };
    apply_overrides(&mut config, cli);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Apply CLI overrides to the configuration.
fn apply_overrides(config: &mut AirdropConfig, cli: &Cli) {
    if let Some(network) = cli.network {
        config.network = network;
    }

    if let Some(ref keystore) = cli.keystore {
        config.keystore.path = keystore.clone();
    }

    if let Some(ref passphrase) = cli.passphrase {
        config.keystore.passphrase = Some(passphrase.clone());
    }

    if let Some(ref dex_url) = cli.dex_url {
        config.endpoints.dex_url = Some(dex_url.clone());
    }

    if let Some(ref node_url) = cli.node_url {
        config.endpoints.node_url = Some(node_url.clone());
    }

    if let Command::Send {
        denom,
        memo,
        interval_ms,
        no_sync,
        dry_run,
        ..
    } = &cli.command
    {
        if let Some(denom) = denom {
            config.transfer.denom = denom.clone();
        }
        if let Some(memo) = memo {
            config.transfer.memo = memo.clone();
        }
        if let Some(interval_ms) = interval_ms {
            config.transfer.interval_ms = *interval_ms;
        }
        if *no_sync {
            config.transfer.sync = false;
        }
        if *dry_run {
            config.transfer.dry_run = true;
        }
    }
}

fn init_logging(cli: &Cli) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let builder = tracing_subscriber::fmt();
    let filter =
        || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let Some(log_file) = &cli.logfile else {
        builder.with_env_filter(filter()).init();
        return Ok(None);
    };

    let directory = log_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf();
    fs::create_dir_all(&directory)?;
    let file_name = log_file
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("Invalid log file name"))?
        .to_string_lossy()
        .to_string();

    let file_appender = tracing_appender::rolling::never(directory, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    builder
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_env_filter(filter())
        .init();
    Ok(Some(guard))
}

/// Cancel the token on Ctrl+C.
fn spawn_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C");
                cancel.cancel();
            }
            Err(e) => warn!(error = %e, "Failed to install Ctrl+C handler"),
        }
    });
}

fn load_key_manager(config: &AirdropConfig) -> Result<KeyManager> {
    let passphrase = config.passphrase()?;
    KeyManager::from_keystore_file(&config.keystore.path, passphrase, config.network)
        .with_context(|| {
            format!(
                "Failed to unlock keystore: {}",
                config.keystore.path.display()
            )
        })
}

async fn run_send(config: &AirdropConfig, recipients_path: &Path) -> Result<()> {
    config
        .validate_for_send()
        .context("Invalid transfer configuration")?;

    let recipients = load_recipients(recipients_path, config.network)
        .context("Failed to load recipients")?;
    if recipients.is_empty() {
        info!("No recipients, nothing to send");
        return Ok(());
    }

    let key_manager = load_key_manager(config)?;
    let dex_url = config.dex_url();
    let client = if config.transfer.dry_run {
        DexClient::with_chain_id(&dex_url, key_manager, "")?
    } else {
        DexClient::new(&dex_url, key_manager)
            .await
            .with_context(|| format!("Failed to connect to DEX at {dex_url}"))?
    };

    let cancel = CancellationToken::new();
    spawn_ctrl_c(cancel.clone());

    let total = recipients.len();
    let batch = BatchSender::new(client, config.batch_config());
    let report = batch.run_until_cancelled(&recipients, cancel).await;
    report.print();

    let remaining = report.remaining(total);
    if remaining > 0 {
        warn!(remaining, "Recipients not attempted");
    }
    Ok(())
}

async fn run_tx(config: &AirdropConfig, hash: &str) -> Result<()> {
    let node_url = config.node_url();
    let client = RpcClient::connect(&node_url)
        .await
        .with_context(|| format!("Failed to connect to node at {node_url}"))?;
    let detail = inspect_tx(&client, hash).await?;
    detail.print(config.network);
    Ok(())
}

async fn run_subscribe(
    config: &AirdropConfig,
    query: &str,
    recipient: Option<&str>,
    capacity: usize,
    duration_secs: u64,
) -> Result<()> {
    let query = match recipient {
        Some(recipient) => Query::txs_to(recipient),
        None => Query::parse(query).context("Invalid query")?,
    };
    println!("{query}");

    let node_url = config.node_url();
    let client = RpcClient::connect(&node_url)
        .await
        .with_context(|| format!("Failed to connect to node at {node_url}"))?;

    let mut watch_config = WatchConfig::new(query, config.network);
    watch_config.capacity = capacity;
    if duration_secs > 0 {
        watch_config = watch_config.with_duration(Duration::from_secs(duration_secs));
    }

    let cancel = CancellationToken::new();
    spawn_ctrl_c(cancel.clone());

    let report = watch(&client, &watch_config, cancel).await?;
    report.print();
    Ok(())
}

fn run_keystore(config: &AirdropConfig, action: &KeystoreCommand) -> Result<()> {
    match action {
        KeystoreCommand::Verify => {
            let key_manager = load_key_manager(config)?;
            let signature = key_manager.sign(CHECK_MESSAGE);
            if !key_manager.public_key().verify(CHECK_MESSAGE, &signature) {
                bail!("Keystore key failed to verify its own signature");
            }
            println!("address: {}", key_manager.address_string());
            println!("public key: {}", hex::encode(key_manager.public_key().to_bytes()));
        }
        KeystoreCommand::Export => {
            let key_manager = load_key_manager(config)?;
            warn!("Exporting private key in plain text");
            println!("{}", key_manager.export_private_key());
        }
        KeystoreCommand::New { force } => {
            let path = &config.keystore.path;
            if path.exists() && !force {
                bail!(
                    "Keystore {} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            let passphrase = config.passphrase()?;
            let key = PrivateKey::generate();
            let keystore = KeyStore::encrypt(&key, passphrase, config.network);
            keystore
                .write_to(path)
                .with_context(|| format!("Failed to write keystore: {}", path.display()))?;
            info!(path = %path.display(), "Wrote keystore");
            println!("address: {}", keystore.address);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging(&cli)?;

    let config = load_config(&cli)?;
    info!(network = %config.network, "Airdrop starting");

    match &cli.command {
        Command::Send { recipients, .. } => run_send(&config, recipients).await,
        Command::Tx { hash } => run_tx(&config, hash).await,
        Command::Subscribe {
            query,
            recipient,
            capacity,
            duration_secs,
        } => {
            run_subscribe(
                &config,
                query,
                recipient.as_deref(),
                *capacity,
                *duration_secs,
            )
            .await
        }
        Command::Keystore { action } => run_keystore(&config, action),
    }
}
