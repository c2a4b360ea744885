//! WebSocket client for the `fanchat` relay.
//!
//! [`ChatClient::connect`] opens a WebSocket to the relay and spawns a
//! background reader that decodes every broadcast frame into an internal
//! channel. Sending writes one postcard-encoded [`ChatMessage`] per binary
//! frame. [`ChatClient::close_send`] half-closes: the relay ends the session
//! and the reader drains whatever was already broadcast.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use fanchat_proto::codec::{self, CodecError};
use fanchat_proto::message::ChatMessage;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

/// Type alias for the write half of a WebSocket connection.
type WsSender = futures_util::stream::SplitSink<
    WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
    Message,
>;

/// Type alias for the read half of a WebSocket connection.
type WsReader =
    futures_util::stream::SplitStream<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>>;

/// Default timeout for connecting to the relay server.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Capacity of the channel between the background reader and [`ChatClient::recv`].
const INCOMING_BUFFER: usize = 256;

/// Errors that can occur in client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The connection attempt did not complete in time.
    #[error("connection to relay timed out")]
    Timeout,

    /// The relay could not be reached at all.
    #[error("relay {0} is unreachable")]
    Unreachable(String),

    /// The connection has been closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// A message could not be encoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The WebSocket layer reported an error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// A connected chat client.
///
/// Every message sent by any client connected to the same relay, including
/// this one, is delivered through [`recv`](Self::recv) in relay order.
pub struct ChatClient {
    /// Name attached to messages sent with [`send`](Self::send).
    name: String,
    /// The relay URL (ws:// or wss://).
    relay_url: String,
    /// Write half of the WebSocket connection (shared for concurrent sends).
    ws_sender: Arc<Mutex<WsSender>>,
    /// Messages decoded by the background reader task.
    incoming: Mutex<mpsc::Receiver<ChatMessage>>,
    /// Whether the WebSocket connection to the relay is active.
    connected: Arc<AtomicBool>,
    /// Background reader task; aborted on drop so the socket is released.
    reader_handle: tokio::task::JoinHandle<()>,
}

impl ChatClient {
    /// Connect to a relay as `name`, with the default timeout.
    ///
    /// # Errors
    ///
    /// See [`connect_with_timeout`](Self::connect_with_timeout).
    pub async fn connect(relay_url: &str, name: impl Into<String>) -> Result<Self, ClientError> {
        Self::connect_with_timeout(relay_url, name, CONNECT_TIMEOUT).await
    }

    /// Connect to a relay as `name`.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Timeout`] if the handshake does not finish within `timeout`.
    /// - [`ClientError::Unreachable`] if nothing is listening at `relay_url`.
    /// - [`ClientError::WebSocket`] for any other connection failure.
    pub async fn connect_with_timeout(
        relay_url: &str,
        name: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let (ws_stream, _response) = tokio::time::timeout(timeout, connect_async(relay_url))
            .await
            .map_err(|_| {
                tracing::warn!(url = relay_url, "relay WebSocket connect timed out");
                ClientError::Timeout
            })?
            .map_err(|e| {
                tracing::warn!(url = relay_url, err = %e, "relay WebSocket connect failed");
                map_ws_connect_error(relay_url, e)
            })?;

        let (ws_sender, ws_reader) = ws_stream.split();

        let (tx, rx) = mpsc::channel(INCOMING_BUFFER);
        let connected = Arc::new(AtomicBool::new(true));
        let reader_handle = tokio::spawn(reader_loop(ws_reader, tx, Arc::clone(&connected)));

        tracing::info!(url = relay_url, "connected to relay");

        Ok(Self {
            name: name.into(),
            relay_url: relay_url.to_string(),
            ws_sender: Arc::new(Mutex::new(ws_sender)),
            incoming: Mutex::new(rx),
            connected,
            reader_handle,
        })
    }

    /// Send `text` under this client's name.
    ///
    /// # Errors
    ///
    /// See [`send_message`](Self::send_message).
    pub async fn send(&self, text: impl Into<String>) -> Result<(), ClientError> {
        self.send_message(&ChatMessage::new(self.name.clone(), text))
            .await
    }

    /// Send a prepared message.
    ///
    /// # Errors
    ///
    /// - [`ClientError::ConnectionClosed`] if the connection is down.
    /// - [`ClientError::Codec`] if the message cannot be encoded.
    pub async fn send_message(&self, msg: &ChatMessage) -> Result<(), ClientError> {
        if !self.connected.load(Ordering::Relaxed) {
            return Err(ClientError::ConnectionClosed);
        }

        let bytes = codec::encode(msg)?;
        let mut sender = self.ws_sender.lock().await;
        sender
            .send(Message::Binary(bytes.into()))
            .await
            .map_err(|e| {
                tracing::warn!(err = %e, "relay send failed");
                self.connected.store(false, Ordering::Relaxed);
                ClientError::ConnectionClosed
            })
    }

    /// Receive the next broadcast message.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConnectionClosed`] once the connection has
    /// ended and every message received before that has been returned.
    pub async fn recv(&self) -> Result<ChatMessage, ClientError> {
        let mut rx = self.incoming.lock().await;
        rx.recv().await.ok_or(ClientError::ConnectionClosed)
    }

    /// Half-close the connection: no more messages will be sent.
    ///
    /// The relay ends the session in response; [`recv`](Self::recv) keeps
    /// returning already-received messages and then reports
    /// [`ClientError::ConnectionClosed`].
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::WebSocket`] if the close frame cannot be sent.
    pub async fn close_send(&self) -> Result<(), ClientError> {
        let mut sender = self.ws_sender.lock().await;
        sender.send(Message::Close(None)).await?;
        Ok(())
    }

    /// Whether the connection to the relay is still up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// The name attached to messages sent with [`send`](Self::send).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the relay URL this client is connected to.
    #[must_use]
    pub fn relay_url(&self) -> &str {
        &self.relay_url
    }
}

impl Drop for ChatClient {
    fn drop(&mut self) {
        self.reader_handle.abort();
    }
}

/// Background task that reads WebSocket frames and decodes them.
///
/// Malformed frames are logged and skipped; the task does not disconnect on
/// bad data. Sets `connected` to `false` when the WebSocket closes or errors
/// out.
async fn reader_loop(
    mut ws_reader: WsReader,
    tx: mpsc::Sender<ChatMessage>,
    connected: Arc<AtomicBool>,
) {
    while let Some(frame) = ws_reader.next().await {
        match frame {
            Ok(Message::Binary(data)) => match codec::decode(&data) {
                Ok(msg) => {
                    if tx.send(msg).await.is_err() {
                        // Receiver dropped with the client, exit.
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(err = %e, "malformed relay frame, skipping");
                }
            },
            Ok(Message::Close(_)) => {
                tracing::info!("relay closed the connection");
                break;
            }
            Ok(Message::Ping(_) | Message::Pong(_) | Message::Text(_) | Message::Frame(_)) => {}
            Err(e) => {
                tracing::warn!(err = %e, "relay WebSocket read error");
                break;
            }
        }
    }
    connected.store(false, Ordering::Relaxed);
    tracing::debug!("relay reader task exiting");
}

/// Map a `tokio_tungstenite` connection error to a [`ClientError`].
fn map_ws_connect_error(url: &str, err: tokio_tungstenite::tungstenite::Error) -> ClientError {
    use tokio_tungstenite::tungstenite::Error as WsError;
    match err {
        WsError::Io(ref io_err)
            if matches!(
                io_err.kind(),
                std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::AddrNotAvailable
            ) =>
        {
            ClientError::Unreachable(url.to_string())
        }
        other => ClientError::WebSocket(other),
    }
}
