//! Transaction lookup and event watching against an in-process node.
//!
//! The mock node serves `/status`, `/tx` and `/websocket`. Every client
//! frame received after the subscribe ack is forwarded to the test so it
//! can check that the watcher unsubscribes on the way out.

use airdrop::{inspect_tx, watch, WatchConfig, WatchReport};
use airdrop_client::{Query, RpcClient};
use airdrop_codec::{Msg, SendMsg, StdSignMsg, StdTx};
use airdrop_types::{AccAddress, Amount, Network, PrivateKey, Transfer, TxHash};
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_test::traced_test;

fn send_tx_bytes() -> Vec<u8> {
    let key = PrivateKey::from_bytes(&[3u8; 32]).unwrap();
    let to = AccAddress::from_slice(&[9u8; 20]).unwrap();
    let transfer = Transfer::single(to, "IRIS-D88", Amount::from_base_units(150_000_000).unwrap());
    let msg = SendMsg::from_transfers(key.public_key().address(), &[transfer]).unwrap();
    StdSignMsg {
        chain_id: "Binance-Chain-Nile".to_string(),
        account_number: 3,
        sequence: 1,
        memo: "airdrop from irisnet ama".to_string(),
        source: 0,
        msgs: vec![msg],
    }
    .sign(&key, Network::Test)
    .encode_for_broadcast()
}

fn other_tx_bytes() -> Vec<u8> {
    StdTx {
        msgs: vec![Msg::Unknown {
            prefix: [0xCE, 0x6D, 0xC0, 0x43],
            body: vec![0x0A, 0x01, 0x01],
        }],
        ..Default::default()
    }
    .encode_for_broadcast()
}

fn event_frame(kind: &str, value: Value) -> String {
    json!({"jsonrpc": "2.0", "id": "airdrop-subscribe#event", "result": {
        "query": "tm.event = 'Tx'",
        "data": {"type": kind, "value": value}
    }})
    .to_string()
}

fn tx_frame(height: i64, tx: &[u8]) -> String {
    event_frame(
        "tendermint/event/Tx",
        json!({"TxResult": {
            "height": height.to_string(),
            "index": 0,
            "tx": STANDARD.encode(tx),
            "result": {"code": 0}
        }}),
    )
}

async fn status() -> Json<Value> {
    Json(json!({
        "jsonrpc": "2.0",
        "id": "",
        "result": {
            "node_info": {"id": "abc", "network": "Binance-Chain-Nile", "moniker": "seed"},
            "sync_info": {"latest_block_height": "120", "catching_up": false}
        }
    }))
}

async fn tx() -> Json<Value> {
    let tx = send_tx_bytes();
    Json(json!({
        "jsonrpc": "2.0",
        "id": "",
        "result": {
            "hash": TxHash::of(&tx).to_hex(),
            "height": "118",
            "index": 0,
            "tx_result": {"code": 0, "log": "Msg 0: "},
            "tx": STANDARD.encode(&tx)
        }
    }))
}

async fn websocket(
    ws: WebSocketUpgrade,
    State(frames): State<mpsc::UnboundedSender<String>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_events(socket, frames))
}

/// Acks the subscription, then serves one frame of each kind.
async fn serve_events(mut socket: WebSocket, frames: mpsc::UnboundedSender<String>) {
    let Some(Ok(WsMessage::Text(request))) = socket.recv().await else {
        return;
    };
    let request: Value = serde_json::from_str(&request).unwrap();
    assert_eq!(request["method"], "subscribe");
    let ack = json!({"jsonrpc": "2.0", "id": request["id"], "result": {}});
    socket.send(WsMessage::Text(ack.to_string())).await.unwrap();

    let served = [
        event_frame("tendermint/event/NewBlock", json!({})),
        tx_frame(118, &send_tx_bytes()),
        tx_frame(119, &[0xde, 0xad]),
        tx_frame(120, &other_tx_bytes()),
    ];
    for frame in served {
        socket.send(WsMessage::Text(frame)).await.unwrap();
    }

    while let Some(Ok(message)) = socket.recv().await {
        if let WsMessage::Text(text) = message {
            let _ = frames.send(text);
        }
    }
}

async fn spawn_node() -> (String, mpsc::UnboundedReceiver<String>) {
    let (frames_tx, frames_rx) = mpsc::unbounded_channel();
    let app = Router::new()
        .route("/status", get(status))
        .route("/tx", get(tx))
        .route("/websocket", get(websocket))
        .with_state(frames_tx);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    (format!("tcp://{addr}"), frames_rx)
}

fn expected_report() -> WatchReport {
    WatchReport {
        events: 4,
        tx_events: 3,
        send_msgs: 1,
        unknown_msgs: 1,
        decode_errors: 1,
    }
}

async fn assert_unsubscribed(frames: &mut mpsc::UnboundedReceiver<String>) {
    let frame = tokio::time::timeout(Duration::from_secs(5), frames.recv())
        .await
        .expect("unsubscribe within timeout")
        .expect("frame");
    let request: Value = serde_json::from_str(&frame).unwrap();
    assert_eq!(request["method"], "unsubscribe");
    assert_eq!(request["params"]["query"], "tm.event = 'Tx'");
}

#[tokio::test]
async fn test_inspect_tx_decodes_send() {
    let (url, _frames) = spawn_node().await;
    let client = RpcClient::connect(&url).await.unwrap();
    let hash = TxHash::of(&send_tx_bytes());

    let detail = inspect_tx(&client, &hash.to_hex()).await.unwrap();
    assert_eq!(detail.result.height, 118);
    assert_eq!(detail.result.hash, hash.to_hex());
    assert!(detail.result.tx_result.is_ok());
    assert_eq!(detail.tx.memo, "airdrop from irisnet ama");

    let Some(Msg::Send(send)) = detail.first_msg() else {
        panic!("expected a send message");
    };
    assert_eq!(send.output_amount_of("IRIS-D88"), 150_000_000);
    assert_eq!(
        send.outputs[0].address,
        AccAddress::from_slice(&[9u8; 20]).unwrap()
    );
}

#[tokio::test]
#[traced_test]
async fn test_watch_stops_at_deadline_and_unsubscribes() {
    let (url, mut frames) = spawn_node().await;
    let client = RpcClient::connect(&url).await.unwrap();
    let config = WatchConfig::new(Query::txs(), Network::Test)
        .with_duration(Duration::from_millis(500));

    let report = watch(&client, &config, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report, expected_report());
    assert!(logs_contain("Watch duration elapsed"));
    assert_unsubscribed(&mut frames).await;
}

#[tokio::test]
async fn test_watch_stops_on_cancel_and_unsubscribes() {
    let (url, mut frames) = spawn_node().await;
    let client = RpcClient::connect(&url).await.unwrap();
    let config = WatchConfig::new(Query::txs(), Network::Test);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        trigger.cancel();
    });

    let report = tokio::time::timeout(Duration::from_secs(10), watch(&client, &config, cancel))
        .await
        .expect("watch stops after cancel")
        .unwrap();
    assert_eq!(report, expected_report());
    assert_unsubscribed(&mut frames).await;
}
