//! HTTP/WebSocket front end for the relay.
//!
//! Serves `GET /ws`. Each upgraded socket is split into transport halves
//! and handed to [`Relay::accept`] for the lifetime of the connection.

use std::sync::Arc;

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::State;

use crate::relay::Relay;
use crate::transport::ws;

/// Default maximum accepted WebSocket message size in bytes (64 KB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Shared state for the axum router.
#[derive(Clone)]
struct AppState {
    relay: Arc<Relay>,
    max_message_size: usize,
}

/// Starts a relay server with default settings on the given address and
/// returns the bound address and a join handle.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    start_server_with_relay(addr, Arc::new(Relay::new()), DEFAULT_MAX_MESSAGE_SIZE).await
}

/// Starts the server in front of an existing [`Relay`].
///
/// This is the primary entry point used by both `main.rs` and test code;
/// keeping the `Arc<Relay>` lets the caller inspect or close it.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_relay(
    addr: &str,
    relay: Arc<Relay>,
    max_message_size: usize,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let state = AppState {
        relay,
        max_message_size,
    };
    let app = axum::Router::new()
        .route("/ws", axum::routing::get(ws_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "relay server error");
        }
    });

    Ok((bound_addr, handle))
}

/// axum handler that upgrades an HTTP request to a WebSocket connection.
async fn ws_handler(
    upgrade: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl axum::response::IntoResponse {
    upgrade
        .max_message_size(state.max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, state.relay))
}

/// Runs one client session to completion. The outcome is logged by
/// [`Relay::accept`].
async fn handle_socket(socket: WebSocket, relay: Arc<Relay>) {
    let (source, sink) = ws::split(socket);
    let _ = relay.accept(source, sink).await;
}
