// Test-specific lint overrides: integration tests use unwrap/expect freely,
// and some pedantic/nursery lints are not appropriate for test code.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::doc_markdown,
    clippy::future_not_send,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! End-to-end broadcast tests: real relay server, real WebSocket clients.
//!
//! These tests validate:
//! - Every connected client, the sender included, receives each message
//! - Every recipient observes the same order, and each sender's messages
//!   keep their sequence
//! - A relay with no clients sits idle without errors

use std::sync::Arc;
use std::time::Duration;

use fanchat::client::ChatClient;
use fanchat_proto::message::ChatMessage;
use fanchat_relay::relay::Relay;
use fanchat_relay::server;

const TIMEOUT: Duration = Duration::from_secs(5);

/// Start an in-process relay on an OS-assigned port.
async fn start_relay() -> (String, Arc<Relay>) {
    let relay = Arc::new(Relay::new());
    let (addr, _handle) = server::start_server_with_relay(
        "127.0.0.1:0",
        Arc::clone(&relay),
        server::DEFAULT_MAX_MESSAGE_SIZE,
    )
    .await
    .expect("failed to start relay");
    (format!("ws://{addr}/ws"), relay)
}

/// Connect a client and wait until the relay has registered it, so that it
/// is guaranteed to be part of the next broadcast.
async fn join(url: &str, relay: &Relay, name: &str) -> ChatClient {
    let before = relay.connection_count();
    let client = ChatClient::connect(url, name).await.unwrap();
    let deadline = tokio::time::Instant::now() + TIMEOUT;
    while relay.connection_count() <= before {
        assert!(
            tokio::time::Instant::now() < deadline,
            "{name} was never registered"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    client
}

async fn recv(client: &ChatClient) -> ChatMessage {
    tokio::time::timeout(TIMEOUT, client.recv())
        .await
        .expect("recv timed out")
        .unwrap()
}

#[tokio::test]
async fn both_clients_receive_hi() {
    let (url, relay) = start_relay().await;
    let a = join(&url, &relay, "A").await;
    let b = join(&url, &relay, "B").await;

    a.send("hi").await.unwrap();

    assert_eq!(recv(&a).await, ChatMessage::new("A", "hi"));
    assert_eq!(recv(&b).await, ChatMessage::new("A", "hi"));
}

#[tokio::test]
async fn three_clients_each_see_every_message() {
    let (url, relay) = start_relay().await;
    let clients = [
        join(&url, &relay, "alice").await,
        join(&url, &relay, "bob").await,
        join(&url, &relay, "carol").await,
    ];

    // One at a time, so the expected order is fixed.
    for sender in &clients {
        sender.send(format!("from {}", sender.name())).await.unwrap();
        for receiver in &clients {
            let got = recv(receiver).await;
            assert_eq!(got.sender, sender.name());
        }
    }
}

#[tokio::test]
async fn duplicates_are_delivered_independently() {
    let (url, relay) = start_relay().await;
    let a = join(&url, &relay, "A").await;

    a.send("same").await.unwrap();
    a.send("same").await.unwrap();

    assert_eq!(recv(&a).await.text, "same");
    assert_eq!(recv(&a).await.text, "same");
}

#[tokio::test]
async fn concurrent_senders_share_one_order() {
    let (url, relay) = start_relay().await;
    let a = Arc::new(join(&url, &relay, "A").await);
    let b = Arc::new(join(&url, &relay, "B").await);
    let watcher = join(&url, &relay, "W").await;

    let send_all = |client: Arc<ChatClient>| {
        tokio::spawn(async move {
            for i in 0..25 {
                client.send(i.to_string()).await.unwrap();
            }
        })
    };
    let ha = send_all(Arc::clone(&a));
    let hb = send_all(Arc::clone(&b));
    ha.await.unwrap();
    hb.await.unwrap();

    let mut seen_by_a = Vec::new();
    let mut seen_by_w = Vec::new();
    for _ in 0..50 {
        seen_by_a.push(recv(&a).await);
        seen_by_w.push(recv(&watcher).await);
    }
    assert_eq!(seen_by_a, seen_by_w, "recipients disagree on order");

    for sender in ["A", "B"] {
        let texts: Vec<String> = seen_by_w
            .iter()
            .filter(|m| m.sender == sender)
            .map(|m| m.text.clone())
            .collect();
        let expected: Vec<String> = (0..25).map(|i| i.to_string()).collect();
        assert_eq!(texts, expected, "FIFO order violated for {sender}");
    }
}

#[tokio::test]
async fn idle_relay_stays_healthy() {
    let (url, relay) = start_relay().await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(relay.connection_count(), 0);
    assert!(!relay.is_closed());

    // Still accepts and serves a client afterwards.
    let a = join(&url, &relay, "late").await;
    a.send("anyone?").await.unwrap();
    assert_eq!(recv(&a).await.text, "anyone?");
}
