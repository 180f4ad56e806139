//! Sequential batch sender.
//!
//! Sends one transaction per recipient, in order, pausing for a fixed
//! interval after each send. A failure for one recipient is recorded and the
//! batch moves on; nothing is retried.

use airdrop_client::{ClientError, DexClient, SendOptions, TxCommitResult};
use airdrop_types::{Amount, Network, Transfer};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::recipients::Recipient;

/// Anything that can submit a set of transfers as one transaction.
pub trait TokenSender {
    fn send_token(
        &self,
        transfers: &[Transfer],
        sync: bool,
        options: &SendOptions,
    ) -> impl Future<Output = Result<TxCommitResult, ClientError>> + Send;
}

impl TokenSender for DexClient {
    fn send_token(
        &self,
        transfers: &[Transfer],
        sync: bool,
        options: &SendOptions,
    ) -> impl Future<Output = Result<TxCommitResult, ClientError>> + Send {
        DexClient::send_token(self, transfers, sync, options)
    }
}

/// Batch sender configuration.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub network: Network,
    pub denom: String,
    pub memo: String,
    /// Pause after every send, including the last.
    pub interval: Duration,
    /// Wait for `CheckTx` before the broadcast returns.
    pub sync: bool,
    /// Print the plan without sending anything.
    pub dry_run: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            network: Network::Test,
            denom: String::new(),
            memo: String::new(),
            interval: Duration::from_secs(1),
            sync: true,
            dry_run: false,
        }
    }
}

/// What happened to one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Success { hash: String },
    Failed { hash: String, log: String },
    Error { message: String },
    /// Not sent (dry run).
    Planned,
}

#[derive(Debug, Clone)]
pub struct RecipientOutcome {
    pub address: String,
    pub amount: Amount,
    pub outcome: SendOutcome,
}

/// Summary of a batch run.
#[derive(Debug, Clone, Default)]
pub struct AirdropReport {
    pub outcomes: Vec<RecipientOutcome>,
    pub succeeded: u64,
    pub failed: u64,
    pub errors: u64,
    /// Base units delivered by successful sends.
    pub total_amount: i64,
    pub duration: Duration,
}

impl AirdropReport {
    /// Recipients never attempted because the run was cancelled.
    pub fn remaining(&self, total: usize) -> usize {
        total.saturating_sub(self.outcomes.len())
    }

    pub fn print(&self) {
        println!("\n=== Airdrop Report ===");
        println!("Duration: {:?}", self.duration);
        println!("Recipients: {}", self.outcomes.len());
        println!("Succeeded: {}", self.succeeded);
        println!("Failed: {}", self.failed);
        println!("Errors: {}", self.errors);
        println!("Total sent: {}", display_units(self.total_amount));
    }

    fn record(&mut self, address: String, amount: Amount, outcome: SendOutcome) {
        match &outcome {
            SendOutcome::Success { .. } => {
                self.succeeded += 1;
                self.total_amount = self.total_amount.saturating_add(amount.base_units());
            }
            SendOutcome::Failed { .. } => self.failed += 1,
            SendOutcome::Error { .. } => self.errors += 1,
            SendOutcome::Planned => {}
        }
        self.outcomes.push(RecipientOutcome {
            address,
            amount,
            outcome,
        });
    }
}

fn display_units(units: i64) -> String {
    Amount::from_base_units(units)
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "0".to_string())
}

/// Sends transfers to recipients one at a time.
pub struct BatchSender<S> {
    sender: S,
    config: BatchConfig,
}

impl<S: TokenSender> BatchSender<S> {
    pub fn new(sender: S, config: BatchConfig) -> Self {
        Self { sender, config }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Send to every recipient.
    pub async fn run(&self, recipients: &[Recipient]) -> AirdropReport {
        self.run_until_cancelled(recipients, CancellationToken::new())
            .await
    }

    /// Send until every recipient is done or the token is cancelled.
    ///
    /// Cancellation takes effect between sends; an in-flight broadcast
    /// completes and is recorded.
    pub async fn run_until_cancelled(
        &self,
        recipients: &[Recipient],
        cancel: CancellationToken,
    ) -> AirdropReport {
        let start = Instant::now();
        let mut report = AirdropReport::default();
        let options = SendOptions::default().with_memo(self.config.memo.clone());

        info!(
            recipients = recipients.len(),
            denom = %self.config.denom,
            interval_ms = self.config.interval.as_millis() as u64,
            dry_run = self.config.dry_run,
            "Starting airdrop"
        );

        for recipient in recipients {
            if cancel.is_cancelled() {
                warn!(sent = report.outcomes.len(), "Airdrop cancelled");
                break;
            }

            let address = recipient.address.to_bech32(self.config.network);

            if self.config.dry_run {
                println!(
                    "plan, {}:{} ({} base units)",
                    address,
                    recipient.amount,
                    recipient.amount.base_units()
                );
                report.record(address, recipient.amount, SendOutcome::Planned);
                continue;
            }

            let transfer = recipient.transfer(&self.config.denom);
            let outcome = match self
                .sender
                .send_token(&[transfer], self.config.sync, &options)
                .await
            {
                Err(e) => {
                    println!("send token occur error, toAddr is {}, err is {}", address, e);
                    warn!(to = %address, error = %e, "Send failed");
                    SendOutcome::Error {
                        message: e.to_string(),
                    }
                }
                Ok(result) if result.ok => {
                    println!(
                        "success, {}:{}, txHash: {}",
                        address,
                        progress_amount(recipient.amount),
                        result.hash
                    );
                    info!(to = %address, hash = %result.hash, "Sent");
                    SendOutcome::Success { hash: result.hash }
                }
                Ok(result) => {
                    println!(
                        "failed, {}:{}, txHash: {}, log: {}",
                        address,
                        progress_amount(recipient.amount),
                        result.hash,
                        result.log
                    );
                    warn!(to = %address, hash = %result.hash, code = result.code, log = %result.log, "Send rejected");
                    SendOutcome::Failed {
                        hash: result.hash,
                        log: result.log,
                    }
                }
            };
            report.record(address, recipient.amount, outcome);

            println!("{}", sleep_line(self.config.interval));
            debug!(interval_ms = self.config.interval.as_millis() as u64, "Sleeping");
            tokio::select! {
                _ = tokio::time::sleep(self.config.interval) => {}
                _ = cancel.cancelled() => {
                    warn!(sent = report.outcomes.len(), "Airdrop cancelled");
                    break;
                }
            }
        }

        report.duration = start.elapsed();
        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            errors = report.errors,
            "Airdrop finished"
        );
        report
    }
}

/// Amount in progress lines: six fractional digits, as `%f` renders it.
fn progress_amount(amount: Amount) -> String {
    format!("{:.6}", amount.as_f64())
}

fn sleep_line(interval: Duration) -> String {
    format!("now sleep {} seconds", interval.as_secs_f64())
}
