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

//! Connection lifecycle tests against a real relay server.
//!
//! These tests validate:
//! - A client that half-closes is deregistered and its stream ends
//! - Clients that vanish without a close frame are deregistered too
//! - Departures never disturb delivery to the clients that remain
//! - Closing the relay stops fan-out without dropping live sessions

use std::sync::Arc;
use std::time::Duration;

use fanchat::client::{ChatClient, ClientError};
use fanchat_relay::relay::Relay;
use fanchat_relay::server;

const TIMEOUT: Duration = Duration::from_secs(5);

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

async fn wait_for_connections(relay: &Relay, expected: usize) {
    let deadline = tokio::time::Instant::now() + TIMEOUT;
    while relay.connection_count() != expected {
        assert!(
            tokio::time::Instant::now() < deadline,
            "expected {expected} connections, have {}",
            relay.connection_count()
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

async fn join(url: &str, relay: &Relay, name: &str) -> ChatClient {
    let expected = relay.connection_count() + 1;
    let client = ChatClient::connect(url, name).await.unwrap();
    wait_for_connections(relay, expected).await;
    client
}

#[tokio::test]
async fn half_close_deregisters_and_ends_stream() {
    let (url, relay) = start_relay().await;
    let a = join(&url, &relay, "A").await;
    let b = join(&url, &relay, "B").await;

    a.send("x").await.unwrap();
    assert_eq!(
        tokio::time::timeout(TIMEOUT, b.recv()).await.unwrap().unwrap().text,
        "x"
    );

    a.close_send().await.unwrap();
    wait_for_connections(&relay, 1).await;

    b.send("after A left").await.unwrap();
    assert_eq!(
        tokio::time::timeout(TIMEOUT, b.recv()).await.unwrap().unwrap().text,
        "after A left"
    );

    // A may still read what arrived before it left, then the stream ends.
    loop {
        match tokio::time::timeout(TIMEOUT, a.recv()).await.unwrap() {
            Ok(msg) => assert_ne!(msg.text, "after A left"),
            Err(ClientError::ConnectionClosed) => break,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
}

#[tokio::test]
async fn dropped_client_is_deregistered() {
    let (url, relay) = start_relay().await;
    let a = join(&url, &relay, "A").await;
    let b = join(&url, &relay, "B").await;

    // No close frame: the TCP connection simply goes away.
    drop(a);
    wait_for_connections(&relay, 1).await;

    b.send("still working").await.unwrap();
    assert_eq!(
        tokio::time::timeout(TIMEOUT, b.recv()).await.unwrap().unwrap().text,
        "still working"
    );
}

#[tokio::test]
async fn churn_leaves_roster_consistent() {
    let (url, relay) = start_relay().await;
    let stayer = join(&url, &relay, "stayer").await;

    for round in 0..5 {
        let visitor = join(&url, &relay, "visitor").await;
        visitor.send(format!("visit {round}")).await.unwrap();
        let seen = tokio::time::timeout(TIMEOUT, stayer.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(seen.text, format!("visit {round}"));
        visitor.close_send().await.unwrap();
        wait_for_connections(&relay, 1).await;
    }
}

#[tokio::test]
async fn closed_relay_keeps_sessions_open() {
    let (url, relay) = start_relay().await;
    let a = join(&url, &relay, "A").await;

    relay.close();
    a.send("nobody hears this").await.unwrap();
    let nothing = tokio::time::timeout(Duration::from_millis(200), a.recv()).await;
    assert!(nothing.is_err(), "message was broadcast after close");
    assert_eq!(relay.connection_count(), 1);

    a.close_send().await.unwrap();
    wait_for_connections(&relay, 0).await;
}
