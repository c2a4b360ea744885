//! Transport seam between the relay core and the network.
//!
//! A connection is consumed as two halves: a [`MessageSource`] read by the
//! session's ingestion routine and a [`MessageSink`] owned by the
//! connection's dispatch loop. Concrete implementations:
//! - [`ws`]: axum WebSocket halves, one postcard frame per message
//! - [`loopback`]: in-process channels for tests and embedding

pub mod loopback;
pub mod ws;

use fanchat_proto::codec::CodecError;
use fanchat_proto::message::ChatMessage;

/// Errors that can occur while reading from or writing to a client.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The other end of the connection has gone away.
    #[error("connection closed")]
    ConnectionClosed,

    /// A frame could not be encoded for the wire.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The underlying WebSocket reported an error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] axum::Error),
}

/// Inbound half of a client connection.
pub trait MessageSource: Send {
    /// Receive the next message sent by the client.
    ///
    /// Returns `Ok(None)` once the client has cleanly closed its sending
    /// side. Any other termination is reported as an error.
    fn recv(
        &mut self,
    ) -> impl std::future::Future<Output = Result<Option<ChatMessage>, TransportError>> + Send;
}

/// Outbound half of a client connection.
pub trait MessageSink: Send + 'static {
    /// Write one message to the client.
    ///
    /// Returning `Ok(())` means the message was handed to the underlying
    /// transport, not that the client has read it.
    fn send(
        &mut self,
        msg: &ChatMessage,
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;
}
