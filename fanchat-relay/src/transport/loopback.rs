//! Loopback transport for testing and embedding.
//!
//! Uses in-process [`tokio::sync::mpsc`] channels to stand in for a network
//! connection between one client and the relay. Created via [`pair`], which
//! returns the client's handle together with the relay-side
//! [`LoopbackSource`] and [`LoopbackSink`] to pass to
//! [`Relay::accept`](crate::relay::Relay::accept).

use fanchat_proto::message::ChatMessage;
use tokio::sync::mpsc;

use super::{MessageSink, MessageSource, TransportError};

/// Client end of a loopback connection.
pub struct LoopbackClient {
    /// Feeds the relay's source. `None` after [`close_send`](Self::close_send).
    to_relay: Option<mpsc::Sender<Result<ChatMessage, TransportError>>>,
    /// Fed by the relay's sink.
    from_relay: mpsc::Receiver<ChatMessage>,
}

/// Relay-side read half of a loopback connection.
pub struct LoopbackSource {
    rx: mpsc::Receiver<Result<ChatMessage, TransportError>>,
}

/// Relay-side write half of a loopback connection.
pub struct LoopbackSink {
    tx: mpsc::Sender<ChatMessage>,
}

/// Create a connected loopback client and its relay-side halves.
///
/// The `buffer` parameter controls the channel capacity for each direction.
/// A client that never calls [`LoopbackClient::recv`] behaves like a frozen
/// peer: once `buffer` messages are pending, writes to it stop completing.
///
/// # Example
///
/// ```rust,no_run
/// use fanchat_proto::message::ChatMessage;
/// use fanchat_relay::relay::Relay;
/// use fanchat_relay::transport::loopback;
///
/// # async fn example() {
/// let relay = std::sync::Arc::new(Relay::new());
/// let (mut client, source, sink) = loopback::pair(32);
/// tokio::spawn(async move { relay.accept(source, sink).await });
///
/// client.send(ChatMessage::new("alice", "hi")).await.unwrap();
/// let echoed = client.recv().await;
/// # }
/// ```
#[must_use]
pub fn pair(buffer: usize) -> (LoopbackClient, LoopbackSource, LoopbackSink) {
    let (to_relay, rx) = mpsc::channel(buffer);
    let (tx, from_relay) = mpsc::channel(buffer);
    let client = LoopbackClient {
        to_relay: Some(to_relay),
        from_relay,
    };
    (client, LoopbackSource { rx }, LoopbackSink { tx })
}

impl LoopbackClient {
    /// Send a message to the relay.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ConnectionClosed`] after
    /// [`close_send`](Self::close_send) or once the relay has dropped its
    /// source.
    pub async fn send(&self, msg: ChatMessage) -> Result<(), TransportError> {
        let tx = self
            .to_relay
            .as_ref()
            .ok_or(TransportError::ConnectionClosed)?;
        tx.send(Ok(msg))
            .await
            .map_err(|_| TransportError::ConnectionClosed)
    }

    /// Receive the next message broadcast to this client.
    ///
    /// Returns `None` once the relay has released its sink and every
    /// pending message has been read.
    pub async fn recv(&mut self) -> Option<ChatMessage> {
        self.from_relay.recv().await
    }

    /// Half-close: the relay observes a clean end-of-stream after reading
    /// any messages already sent.
    pub fn close_send(&mut self) {
        self.to_relay = None;
    }

    /// Make the relay's next read fail with `err`, then end the stream.
    pub async fn fail(&mut self, err: TransportError) {
        if let Some(tx) = self.to_relay.take() {
            let _ = tx.send(Err(err)).await;
        }
    }
}

impl MessageSource for LoopbackSource {
    async fn recv(&mut self) -> Result<Option<ChatMessage>, TransportError> {
        self.rx.recv().await.transpose()
    }
}

impl MessageSink for LoopbackSink {
    async fn send(&mut self, msg: &ChatMessage) -> Result<(), TransportError> {
        self.tx
            .send(msg.clone())
            .await
            .map_err(|_| TransportError::ConnectionClosed)
    }
}
