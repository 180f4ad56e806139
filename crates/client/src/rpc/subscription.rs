//! Websocket event subscription.

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::types::{ResultEvent, RpcResponse};
use crate::query::Query;
use crate::ClientError;

const SUBSCRIBE_ID: &str = "airdrop-subscribe";
const UNSUBSCRIBE_ID: &str = "airdrop-unsubscribe";

/// How long to wait for the node to acknowledge `subscribe`.
const ACK_TIMEOUT: Duration = Duration::from_secs(10);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A live subscription.
///
/// Events are buffered in a bounded channel; when it is full the reader
/// stops pulling from the socket until the consumer catches up. Dropping
/// the subscription cancels it.
pub struct Subscription {
    query: String,
    events: mpsc::Receiver<ResultEvent>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Subscription {
    pub(crate) async fn open(
        ws_url: &str,
        query: &Query,
        capacity: usize,
    ) -> Result<Self, ClientError> {
        let (stream, _) = connect_async(ws_url).await?;
        let (mut sink, mut source) = stream.split();
        let query = query.to_string();

        let request = json!({
            "jsonrpc": "2.0",
            "id": SUBSCRIBE_ID,
            "method": "subscribe",
            "params": { "query": query },
        });
        sink.send(Message::Text(request.to_string())).await?;

        match tokio::time::timeout(ACK_TIMEOUT, wait_for_ack(&mut sink, &mut source)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ClientError::WebSocket(
                    "timed out waiting for subscribe acknowledgement".to_string(),
                ))
            }
        }
        info!(query = %query, url = %ws_url, "Subscribed");

        let (tx, rx) = mpsc::channel(capacity.max(1));
        let cancel = CancellationToken::new();
        let task = tokio::spawn(pump(sink, source, tx, cancel.clone(), query.clone()));

        Ok(Self {
            query,
            events: rx,
            cancel,
            task,
        })
    }

    /// Next event, or `None` once the subscription has ended.
    pub async fn next(&mut self) -> Option<ResultEvent> {
        self.events.recv().await
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Token that cancels this subscription when triggered.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Unsubscribe and wait for the reader task to finish.
    pub async fn close(mut self) {
        self.cancel.cancel();
        if let Err(e) = (&mut self.task).await {
            warn!(error = %e, "Subscription task failed");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn wait_for_ack(
    sink: &mut SplitSink<WsStream, Message>,
    source: &mut SplitStream<WsStream>,
) -> Result<(), ClientError> {
    while let Some(message) = source.next().await {
        match message? {
            Message::Text(text) => {
                let response: RpcResponse<serde_json::Value> = serde_json::from_str(&text)
                    .map_err(|e| ClientError::Decode(e.to_string()))?;
                if response.id.as_ref().and_then(|id| id.as_str()) != Some(SUBSCRIBE_ID) {
                    continue;
                }
                response.into_result()?;
                return Ok(());
            }
            Message::Ping(payload) => sink.send(Message::Pong(payload)).await?,
            Message::Close(_) => break,
            _ => {}
        }
    }
    Err(ClientError::SubscriptionClosed)
}

/// Forward events from the socket into the channel until cancelled.
async fn pump(
    mut sink: SplitSink<WsStream, Message>,
    mut source: SplitStream<WsStream>,
    events: mpsc::Sender<ResultEvent>,
    cancel: CancellationToken,
    query: String,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            message = source.next() => match message {
                Some(Ok(Message::Text(text))) => match parse_event(&text) {
                    Ok(Some(event)) => {
                        tokio::select! {
                            sent = events.send(event) => {
                                if sent.is_err() {
                                    debug!("Subscription receiver dropped");
                                    break;
                                }
                            }
                            _ = cancel.cancelled() => break,
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "Skipping undecodable event"),
                },
                Some(Ok(Message::Ping(payload))) => {
                    if let Err(e) = sink.send(Message::Pong(payload)).await {
                        warn!(error = %e, "Failed to answer ping");
                        return;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "Node closed subscription");
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "Subscription stream failed");
                    return;
                }
                None => {
                    debug!("Subscription stream ended");
                    return;
                }
            },
        }
    }
    unsubscribe(&mut sink, &query).await;
}

/// Send `unsubscribe` and close the socket. Only reached while the socket
/// is still open.
async fn unsubscribe(sink: &mut SplitSink<WsStream, Message>, query: &str) {
    let request = json!({
        "jsonrpc": "2.0",
        "id": UNSUBSCRIBE_ID,
        "method": "unsubscribe",
        "params": { "query": query },
    });
    if let Err(e) = sink.send(Message::Text(request.to_string())).await {
        debug!(error = %e, "Unsubscribe not delivered");
    }
    let _ = sink.close().await;
    debug!(query = %query, "Unsubscribed");
}

fn parse_event(text: &str) -> Result<Option<ResultEvent>, ClientError> {
    let response: RpcResponse<serde_json::Value> =
        serde_json::from_str(text).map_err(|e| ClientError::Decode(e.to_string()))?;
    if let Some(error) = response.error {
        return Err(error.into());
    }
    match response.result {
        Some(result) => ResultEvent::from_result(result),
        None => Ok(None),
    }
}
