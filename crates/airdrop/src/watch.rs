//! Live transaction watcher.
//!
//! Subscribes to an event query and decodes every committed transaction
//! on a background listener until the run duration elapses or the caller
//! cancels.

use airdrop_client::{EventData, Query, ResultEvent, RpcClient, Subscription};
use airdrop_codec::Msg;
use airdrop_types::Network;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::inspect::{describe_first_msg, to_json_string};
use crate::AirdropError;

/// Events buffered between the socket reader and the listener.
pub const DEFAULT_CAPACITY: usize = 10;

#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub query: Query,
    pub capacity: usize,
    /// Stop after this long; `None` runs until cancelled.
    pub duration: Option<Duration>,
    pub network: Network,
}

impl WatchConfig {
    pub fn new(query: Query, network: Network) -> Self {
        Self {
            query,
            capacity: DEFAULT_CAPACITY,
            duration: None,
            network,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// Counts collected by the listener.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchReport {
    pub events: u64,
    pub tx_events: u64,
    pub send_msgs: u64,
    pub unknown_msgs: u64,
    pub decode_errors: u64,
}

impl WatchReport {
    pub fn print(&self) {
        println!("\n=== Watch Report ===");
        println!("Events: {}", self.events);
        println!("Tx events: {}", self.tx_events);
        println!("Send messages: {}", self.send_msgs);
        println!("Other messages: {}", self.unknown_msgs);
        println!("Decode errors: {}", self.decode_errors);
    }
}

/// Subscribe and decode events until the duration elapses, `cancel` fires,
/// or the node ends the subscription.
pub async fn watch(
    client: &RpcClient,
    config: &WatchConfig,
    cancel: CancellationToken,
) -> Result<WatchReport, AirdropError> {
    let subscription = client.subscribe(&config.query, config.capacity).await?;
    info!(query = %config.query, capacity = config.capacity, "Watching events");

    let stop = cancel.child_token();
    let mut listener = tokio::spawn(listen(subscription, config.network, stop.clone()));

    let deadline = async {
        match config.duration {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = deadline => info!("Watch duration elapsed"),
        _ = cancel.cancelled() => info!("Watch cancelled"),
        report = &mut listener => return Ok(report?),
    }

    stop.cancel();
    Ok(listener.await?)
}

async fn listen(
    mut subscription: Subscription,
    network: Network,
    stop: CancellationToken,
) -> WatchReport {
    let mut report = WatchReport::default();
    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            event = subscription.next() => match event {
                Some(event) => handle_event(&event, network, &mut report),
                None => {
                    warn!("Subscription ended");
                    break;
                }
            },
        }
    }
    subscription.close().await;
    report
}

fn handle_event(event: &ResultEvent, network: Network, report: &mut WatchReport) {
    report.events += 1;
    let tx_event = match &event.data {
        EventData::Tx(tx_event) => tx_event,
        EventData::Other { kind, .. } => {
            debug!(kind = %kind, "Ignoring non-tx event");
            return;
        }
    };
    report.tx_events += 1;
    println!("txData is:\n {}", to_json_string(tx_event));

    let tx = match tx_event.decode_tx() {
        Ok(tx) => tx,
        Err(e) => {
            report.decode_errors += 1;
            warn!(height = tx_event.height, hash = %tx_event.hash(), error = %e, "Failed to decode tx");
            println!("{e}");
            return;
        }
    };

    match tx.first_msg() {
        Some(Msg::Send(_)) => report.send_msgs += 1,
        Some(Msg::Unknown { .. }) => report.unknown_msgs += 1,
        None => {}
    }
    if let Some(line) = describe_first_msg(&tx, network) {
        println!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airdrop_client::{TxEvent, TxResult};

    fn tx_event(tx: Vec<u8>) -> ResultEvent {
        ResultEvent {
            query: "tm.event = 'Tx'".to_string(),
            data: EventData::Tx(TxEvent {
                height: 1,
                index: 0,
                tx,
                result: TxResult::default(),
            }),
        }
    }

    #[test]
    fn test_decode_errors_are_counted_not_fatal() {
        let mut report = WatchReport::default();
        handle_event(&tx_event(vec![0xde, 0xad]), Network::Test, &mut report);
        handle_event(
            &ResultEvent {
                query: String::new(),
                data: EventData::Other {
                    kind: "tendermint/event/NewBlock".to_string(),
                    value: serde_json::Value::Null,
                },
            },
            Network::Test,
            &mut report,
        );
        assert_eq!(
            report,
            WatchReport {
                events: 2,
                tx_events: 1,
                decode_errors: 1,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_config_defaults() {
        let config = WatchConfig::new(Query::txs(), Network::Test)
            .with_duration(Duration::from_secs(600));
        assert_eq!(config.capacity, 10);
        assert_eq!(config.duration, Some(Duration::from_secs(600)));
    }
}
