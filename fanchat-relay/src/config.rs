//! Configuration system for the `fanchat` relay server.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/fanchat-relay/config.toml`)
//! 4. Compiled defaults

use std::path::{Path, PathBuf};

use crate::relay::{DEFAULT_BROADCAST_CAPACITY, DEFAULT_OUTBOUND_QUEUE_CAPACITY};
use crate::server::DEFAULT_MAX_MESSAGE_SIZE;

/// Why the relay configuration could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file exists (or was named explicitly) but could not be read.
    #[error("cannot read relay config {}: {source}", .path.display())]
    Read {
        /// File that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML or has a wrongly typed key.
    #[error("invalid relay config {}: {source}", .path.display())]
    Parse {
        /// File that was parsed.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure for the relay.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct RelayConfigFile {
    server: ServerFileConfig,
    relay: RelayFileConfig,
}

/// `[server]` section of the relay config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerFileConfig {
    bind_addr: Option<String>,
    max_message_size: Option<usize>,
}

/// `[relay]` section of the relay config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct RelayFileConfig {
    broadcast_capacity: Option<usize>,
    outbound_queue_capacity: Option<usize>,
}

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// CLI arguments for the relay server.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "fanchat broadcast relay server")]
pub struct RelayCliArgs {
    /// Address to bind the relay server to.
    #[arg(short, long, env = "FANCHAT_RELAY_ADDR")]
    pub bind: Option<String>,

    /// Path to config file (default: `~/.config/fanchat-relay/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Maximum accepted WebSocket message size in bytes.
    #[arg(long)]
    pub max_message_size: Option<usize>,

    /// Capacity of the shared broadcast channel.
    #[arg(long)]
    pub broadcast_capacity: Option<usize>,

    /// Per-connection outbound queue capacity; a client that falls this far
    /// behind is disconnected.
    #[arg(long)]
    pub outbound_queue_capacity: Option<usize>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "FANCHAT_RELAY_LOG")]
    pub log_level: String,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved relay server configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address to bind the server to (e.g., `0.0.0.0:8080`).
    pub bind_addr: String,
    /// Maximum accepted WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Capacity of the shared broadcast channel.
    pub broadcast_capacity: usize,
    /// Per-connection outbound queue capacity.
    pub outbound_queue_capacity: usize,
    /// Log level filter string.
    pub log_level: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
            outbound_queue_capacity: DEFAULT_OUTBOUND_QUEUE_CAPACITY,
            log_level: "info".to_string(),
        }
    }
}

impl RelayConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an error.
    /// If no `--config` is given, the default path is tried and missing file
    /// is treated as empty config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read
    /// or parsed.
    pub fn load(cli: &RelayCliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Resolve a `RelayConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default.
    #[must_use]
    fn resolve(cli: &RelayCliArgs, file: &RelayConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            bind_addr: cli
                .bind
                .clone()
                .or_else(|| file.server.bind_addr.clone())
                .unwrap_or(defaults.bind_addr),
            max_message_size: cli
                .max_message_size
                .or(file.server.max_message_size)
                .unwrap_or(defaults.max_message_size),
            broadcast_capacity: cli
                .broadcast_capacity
                .or(file.relay.broadcast_capacity)
                .unwrap_or(defaults.broadcast_capacity),
            outbound_queue_capacity: cli
                .outbound_queue_capacity
                .or(file.relay.outbound_queue_capacity)
                .unwrap_or(defaults.outbound_queue_capacity),
            log_level: cli.log_level.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// `fanchat-relay/config.toml` under the platform config directory, if any.
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("fanchat-relay").join("config.toml"))
}

/// Read the relay config file.
///
/// An explicit path must exist. The default path is optional: when it is
/// missing, or the platform has no config directory, an empty file is assumed.
fn load_config_file(explicit_path: Option<&Path>) -> Result<RelayConfigFile, ConfigError> {
    let (path, required) = match explicit_path {
        Some(p) => (p.to_path_buf(), true),
        None => match default_config_path() {
            Some(p) => (p, false),
            None => return Ok(RelayConfigFile::default()),
        },
    };

    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(RelayConfigFile::default());
        }
        Err(source) => return Err(ConfigError::Read { path, source }),
    };
    parse_config(&path, &contents)
}

fn parse_config(path: &Path, contents: &str) -> Result<RelayConfigFile, ConfigError> {
    toml::from_str(contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
