//! WebSocket halves for the relay server.
//!
//! Wraps the split halves of an upgraded axum [`WebSocket`]. Each binary
//! frame carries one postcard-encoded [`ChatMessage`].

use axum::extract::ws::{Message, WebSocket};
use fanchat_proto::codec;
use fanchat_proto::message::ChatMessage;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};

use super::{MessageSink, MessageSource, TransportError};

/// Read half of a client WebSocket.
pub struct WsSource {
    inner: SplitStream<WebSocket>,
}

impl WsSource {
    /// Wraps the read half of a split WebSocket.
    #[must_use]
    pub const fn new(inner: SplitStream<WebSocket>) -> Self {
        Self { inner }
    }
}

impl MessageSource for WsSource {
    /// Reads frames until one decodes to a [`ChatMessage`].
    ///
    /// Malformed binary frames are logged and skipped rather than ending the
    /// session. Text, ping and pong frames are ignored. A close frame or the
    /// end of the stream is a clean end-of-stream.
    async fn recv(&mut self) -> Result<Option<ChatMessage>, TransportError> {
        while let Some(frame) = self.inner.next().await {
            match frame? {
                Message::Binary(data) => match codec::decode(&data) {
                    Ok(msg) => return Ok(Some(msg)),
                    Err(e) => {
                        tracing::warn!(error = %e, "malformed frame, skipping");
                    }
                },
                Message::Close(_) => return Ok(None),
                Message::Text(_) | Message::Ping(_) | Message::Pong(_) => {}
            }
        }
        Ok(None)
    }
}

/// Write half of a client WebSocket.
pub struct WsSink {
    inner: SplitSink<WebSocket, Message>,
}

impl WsSink {
    /// Wraps the write half of a split WebSocket.
    #[must_use]
    pub const fn new(inner: SplitSink<WebSocket, Message>) -> Self {
        Self { inner }
    }
}

impl MessageSink for WsSink {
    async fn send(&mut self, msg: &ChatMessage) -> Result<(), TransportError> {
        let bytes = codec::encode(msg)?;
        self.inner.send(Message::Binary(bytes.into())).await?;
        Ok(())
    }
}

/// Splits an upgraded socket into relay transport halves.
#[must_use]
pub fn split(socket: WebSocket) -> (WsSource, WsSink) {
    let (sink, stream) = socket.split();
    (WsSource::new(stream), WsSink::new(sink))
}
