//! Command-line configuration for the `fanchat` client.
//!
//! Every option can also come from an environment variable where one is
//! listed; there is no config file.

use std::path::PathBuf;
use std::time::Duration;

use crate::client::CONNECT_TIMEOUT;

/// CLI arguments for the chat client.
#[derive(clap::Parser, Debug)]
#[command(version, about = "Chat through a fanchat relay")]
pub struct CliArgs {
    /// WebSocket URL of the relay (e.g. `ws://127.0.0.1:8080/ws`).
    #[arg(env = "FANCHAT_URL")]
    pub url: String,

    /// Name shown next to your messages.
    #[arg(env = "FANCHAT_NAME")]
    pub name: String,

    /// Seconds to wait for the relay to accept the connection.
    #[arg(long, default_value_t = CONNECT_TIMEOUT.as_secs())]
    pub connect_timeout_secs: u64,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "FANCHAT_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/fanchat.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl CliArgs {
    /// The connect timeout as a [`Duration`].
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
