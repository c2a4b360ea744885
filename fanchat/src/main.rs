//! `fanchat`: chat with everyone connected to a relay.
//!
//! Each line typed on stdin is sent to the relay; every message the relay
//! broadcasts (your own included) is printed as `sender: text`. Type `quit`
//! or close stdin to leave.
//!
//! ```bash
//! cargo run --bin fanchat -- ws://127.0.0.1:8080/ws alice
//! ```

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_appender::non_blocking::WorkerGuard;

use fanchat::client::{ChatClient, ClientError};
use fanchat::config::CliArgs;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();

    // Logs go to a file; stdout is the chat transcript.
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    let client = match ChatClient::connect_with_timeout(&cli.url, &cli.name, cli.connect_timeout())
        .await
    {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to connect to {}: {e}", cli.url);
            return ExitCode::FAILURE;
        }
    };

    println!("Connection established, type \"quit\" or use ctrl+c to exit");

    match run(client).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Connection lost: {e}");
            tracing::error!(error = %e, "chat session failed");
            ExitCode::FAILURE
        }
    }
}

/// Pump stdin lines to the relay and relay broadcasts to stdout until the
/// user quits or the relay goes away.
async fn run(client: ChatClient) -> Result<(), ClientError> {
    let client = std::sync::Arc::new(client);

    let printer = {
        let client = std::sync::Arc::clone(&client);
        tokio::spawn(async move {
            while let Ok(msg) = client.recv().await {
                println!("{msg}");
            }
        })
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read stdin");
                break;
            }
        };
        if line == "quit" {
            break;
        }
        if let Err(e) = client.send(line).await {
            printer.abort();
            return Err(e);
        }
    }

    tracing::info!("closing chat session");
    client.close_send().await?;
    // The relay ends the stream once it has seen the close.
    let _ = printer.await;
    Ok(())
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("fanchat.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}
