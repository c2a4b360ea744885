//! `fanchat` relay server: broadcasts every client's messages to every client.
//!
//! An axum WebSocket server. Clients connect to `/ws` and exchange
//! postcard-encoded `{sender, text}` frames; nothing is stored.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 0.0.0.0:8080
//! cargo run --bin fanchat-relay
//!
//! # Run on custom address
//! cargo run --bin fanchat-relay -- --bind 127.0.0.1:9000
//!
//! # Or via environment variable
//! FANCHAT_RELAY_ADDR=127.0.0.1:9000 cargo run --bin fanchat-relay
//! ```

use std::sync::Arc;

use clap::Parser;
use fanchat_relay::config::{RelayCliArgs, RelayConfig};
use fanchat_relay::relay::Relay;
use fanchat_relay::server;

#[tokio::main]
async fn main() {
    let cli = RelayCliArgs::parse();

    // Load config from CLI args + config file + env vars + defaults.
    let config = match RelayConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(
        addr = %config.bind_addr,
        broadcast_capacity = config.broadcast_capacity,
        outbound_queue_capacity = config.outbound_queue_capacity,
        "starting fanchat relay server"
    );

    let relay = Arc::new(Relay::with_capacities(
        config.broadcast_capacity,
        config.outbound_queue_capacity,
    ));

    let (bound_addr, handle) = match server::start_server_with_relay(
        &config.bind_addr,
        Arc::clone(&relay),
        config.max_message_size,
    )
    .await
    {
        Ok(started) => started,
        Err(e) => {
            tracing::error!(error = %e, "failed to start relay server");
            std::process::exit(1);
        }
    };
    tracing::info!(addr = %bound_addr, "relay server listening");

    tokio::select! {
        result = handle => {
            if let Err(e) = result {
                tracing::error!(error = %e, "relay server task failed");
            }
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
            tracing::info!(
                connections = relay.connection_count(),
                "shutting down relay server"
            );
        }
    }

    relay.close();
}
