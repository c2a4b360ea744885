//! `fanchat` client library.
//!
//! Exposes [`client::ChatClient`], which connects to a `fanchat` relay and
//! sends and receives broadcast chat messages.

pub mod client;
pub mod config;
