//! Per-connection agent.
//!
//! A [`ConnectionAgent`] sits between one client transport and the relay.
//! It owns a bounded outbound queue drained by its own dispatch task, so
//! "a message is available for this client" is decoupled from "the client
//! is ready to accept it". Its ingestion routine, driven by the session
//! handler, reads the client and forwards each message to the broadcast
//! channel.
//!
//! All loops of an agent observe one [`CancellationToken`]. Firing it
//! (through [`ConnectionAgent::close`]) stops the dispatch loop, abandons
//! pending broadcast handoffs and turns further enqueues into no-ops.

use std::fmt;

use fanchat_proto::message::ChatMessage;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::SessionError;
use crate::transport::{MessageSink, MessageSource};

/// Identifies one accepted connection, for logs and roster keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Creates a new time-ordered connection identifier (UUID v7).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of [`ConnectionAgent::enqueue`].
///
/// None of these is an error for the caller: a message that cannot be
/// queued is simply not delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// The message is queued for delivery.
    Queued,
    /// The agent has shut down; the message was dropped.
    Closed,
    /// The queue was full; the message was dropped and the agent closed.
    Evicted,
}

/// One live client session.
pub struct ConnectionAgent {
    id: ConnectionId,
    /// Producer side of the outbound queue. `None` once closed.
    outbound: Mutex<Option<mpsc::Sender<ChatMessage>>>,
    shutdown: CancellationToken,
}

impl ConnectionAgent {
    /// Creates an agent writing to `sink` and starts its dispatch loop.
    ///
    /// `capacity` bounds the outbound queue (a value of zero is treated as
    /// one). Must be called from within a Tokio runtime.
    pub fn spawn<W: MessageSink>(sink: W, capacity: usize) -> Self {
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let shutdown = CancellationToken::new();

        tokio::spawn(dispatch_loop(id, rx, sink, shutdown.clone()));

        Self {
            id,
            outbound: Mutex::new(Some(tx)),
            shutdown,
        }
    }

    /// Returns this connection's identifier.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Whether shutdown has been initiated.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Queue `msg` for delivery to this client without waiting.
    ///
    /// After shutdown this is a no-op returning [`Enqueued::Closed`]. A full
    /// queue means the client is not keeping up: the message is dropped and
    /// the agent closes itself, so the caller is never stalled by one slow
    /// peer and later messages cannot overtake earlier ones.
    pub fn enqueue(&self, msg: ChatMessage) -> Enqueued {
        let outbound = self.outbound.lock();
        let Some(tx) = outbound.as_ref() else {
            return Enqueued::Closed;
        };
        match tx.try_send(msg) {
            Ok(()) => Enqueued::Queued,
            Err(TrySendError::Closed(_)) => Enqueued::Closed,
            Err(TrySendError::Full(_)) => {
                drop(outbound);
                tracing::warn!(connection_id = %self.id, "outbound queue full, evicting connection");
                self.close();
                Enqueued::Evicted
            }
        }
    }

    /// Fire the shutdown signal and release the outbound queue.
    ///
    /// Idempotent; safe to call concurrently from several tasks.
    pub fn close(&self) {
        self.shutdown.cancel();
        if self.outbound.lock().take().is_some() {
            tracing::debug!(connection_id = %self.id, "connection agent closed");
        }
    }

    /// Read `source` until it ends, forwarding every message to `broadcast`.
    ///
    /// Forwarding runs on a separate task per agent so a full broadcast
    /// channel never stalls reading, while messages from this client keep
    /// their order. A handoff still pending when shutdown fires is
    /// abandoned.
    ///
    /// The handoff queue is unbounded: a client that outpaces the broadcast
    /// channel grows relay memory until it stops sending or is closed.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Transport`] if reading from the client fails.
    /// - [`SessionError::Evicted`] if the agent is closed elsewhere while
    ///   reading.
    ///
    /// Both cases, like a clean end-of-stream, leave the agent closed.
    pub async fn ingest<S: MessageSource>(
        &self,
        source: &mut S,
        broadcast: mpsc::Sender<ChatMessage>,
    ) -> Result<(), SessionError> {
        let (forward_tx, forward_rx) = mpsc::unbounded_channel();
        tokio::spawn(forward_loop(
            self.id,
            forward_rx,
            broadcast,
            self.shutdown.clone(),
        ));

        loop {
            let next = tokio::select! {
                biased;
                () = self.shutdown.cancelled() => return Err(SessionError::Evicted),
                next = source.recv() => next,
            };

            match next {
                Ok(Some(msg)) => {
                    tracing::debug!(connection_id = %self.id, sender = %msg.sender, "message received");
                    // Only fails once the forwarder has given up after shutdown.
                    let _ = forward_tx.send(msg);
                }
                Ok(None) => {
                    tracing::debug!(connection_id = %self.id, "client closed its stream");
                    self.close();
                    return Ok(());
                }
                Err(e) => {
                    self.close();
                    return Err(e.into());
                }
            }
        }
    }
}

impl fmt::Debug for ConnectionAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionAgent")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Drains the outbound queue into the client transport until shutdown.
///
/// Write failures are logged and skipped: detecting a dead peer is the
/// ingestion side's job.
async fn dispatch_loop<W: MessageSink>(
    id: ConnectionId,
    mut queue: mpsc::Receiver<ChatMessage>,
    mut sink: W,
    shutdown: CancellationToken,
) {
    loop {
        let msg = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            next = queue.recv() => match next {
                Some(msg) => msg,
                None => break,
            },
        };

        tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            result = sink.send(&msg) => {
                if let Err(e) = result {
                    tracing::debug!(connection_id = %id, error = %e, "write to client failed");
                }
            }
        }
    }
    tracing::debug!(connection_id = %id, "dispatch loop exiting");
}

/// Hands messages read from one client to the broadcast channel in order.
async fn forward_loop(
    id: ConnectionId,
    mut pending: mpsc::UnboundedReceiver<ChatMessage>,
    broadcast: mpsc::Sender<ChatMessage>,
    shutdown: CancellationToken,
) {
    while let Some(msg) = pending.recv().await {
        tokio::select! {
            biased;
            result = broadcast.send(msg) => {
                if result.is_err() {
                    tracing::debug!(connection_id = %id, "broadcast channel closed, dropping message");
                    break;
                }
            }
            () = shutdown.cancelled() => {
                tracing::debug!(connection_id = %id, "connection closed, abandoning handoff");
                break;
            }
        }
    }
}
