//! `fanchat` relay server library.
//!
//! Every message a connected client sends is broadcast to every connected
//! client, the sender included. [`relay::Relay`] owns the roster of live
//! connections and the broadcast fan-out; [`agent::ConnectionAgent`] wraps
//! one client transport; [`server`] binds the relay to WebSockets.

pub mod agent;
pub mod config;
pub mod error;
pub mod relay;
pub mod roster;
pub mod server;
pub mod transport;

pub use error::SessionError;
