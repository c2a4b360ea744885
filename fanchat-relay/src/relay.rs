//! Relay core: connection roster, broadcast channel and fan-out.
//!
//! Every connected client's ingestion routine feeds one shared broadcast
//! channel. A single dispatch task drains it and, for each message, takes a
//! snapshot of the [`Roster`] and enqueues the message on every agent in
//! that snapshot, the sender included. Enqueueing never waits, so one slow
//! or dead client cannot delay delivery to the others.

use std::sync::Arc;

use fanchat_proto::message::ChatMessage;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::agent::{ConnectionAgent, Enqueued};
use crate::error::SessionError;
use crate::roster::Roster;
use crate::transport::{MessageSink, MessageSource};

/// Default capacity of the shared broadcast channel.
pub const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// Default capacity of each connection's outbound queue.
pub const DEFAULT_OUTBOUND_QUEUE_CAPACITY: usize = 1024;

/// The broadcast relay.
///
/// Create one per server with [`Relay::new`] or [`Relay::with_capacities`]
/// (inside a Tokio runtime) and share it behind an [`Arc`].
pub struct Relay {
    roster: Arc<Roster>,
    broadcast: mpsc::Sender<ChatMessage>,
    outbound_capacity: usize,
    shutdown: CancellationToken,
}

impl Relay {
    /// Creates a relay with default channel capacities.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacities(DEFAULT_BROADCAST_CAPACITY, DEFAULT_OUTBOUND_QUEUE_CAPACITY)
    }

    /// Creates a relay with the given broadcast channel and per-connection
    /// outbound queue capacities, and starts its dispatch loop.
    ///
    /// Zero capacities are treated as one.
    #[must_use]
    pub fn with_capacities(broadcast_capacity: usize, outbound_capacity: usize) -> Self {
        let roster = Arc::new(Roster::new());
        let (tx, rx) = mpsc::channel(broadcast_capacity.max(1));
        let shutdown = CancellationToken::new();

        tokio::spawn(dispatch_loop(Arc::clone(&roster), rx, shutdown.clone()));

        Self {
            roster,
            broadcast: tx,
            outbound_capacity: outbound_capacity.max(1),
            shutdown,
        }
    }

    /// Serve one client connection for its whole lifetime.
    ///
    /// Registers a new [`ConnectionAgent`] writing to `sink`, reads `source`
    /// until the client goes away, then deregisters the agent.
    ///
    /// # Errors
    ///
    /// Returns the [`SessionError`] that ended ingestion. A clean close by
    /// the client is `Ok(())`.
    pub async fn accept<S, W>(&self, mut source: S, sink: W) -> Result<(), SessionError>
    where
        S: MessageSource,
        W: MessageSink,
    {
        let agent = Arc::new(ConnectionAgent::spawn(sink, self.outbound_capacity));
        let id = agent.id();
        let live = self.roster.insert(Arc::clone(&agent));
        tracing::info!(connection_id = %id, connections = live, "connection registered");

        // Deregisters even if this future is dropped before ingestion ends.
        let registration = Registration {
            roster: &self.roster,
            agent: Arc::clone(&agent),
        };
        let result = agent.ingest(&mut source, self.broadcast.clone()).await;
        drop(registration);

        match &result {
            Ok(()) => {
                tracing::info!(connection_id = %id, "connection closed by client");
            }
            Err(e) => {
                tracing::warn!(connection_id = %id, error = %e, "connection terminated");
            }
        }
        result
    }

    /// Number of connections currently registered.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.roster.len()
    }

    /// Stop the broadcast dispatch loop.
    ///
    /// Connected sessions are left running; their messages are no longer
    /// fanned out.
    pub fn close(&self) {
        self.shutdown.cancel();
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Roster membership of one session. Dropping it removes the agent from the
/// roster and closes it.
struct Registration<'a> {
    roster: &'a Roster,
    agent: Arc<ConnectionAgent>,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.roster.remove(self.agent.id());
        self.agent.close();
    }
}

/// Drains the broadcast channel, fanning each message out to a roster
/// snapshot.
async fn dispatch_loop(
    roster: Arc<Roster>,
    mut broadcast: mpsc::Receiver<ChatMessage>,
    shutdown: CancellationToken,
) {
    loop {
        let msg = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            next = broadcast.recv() => match next {
                Some(msg) => msg,
                None => break,
            },
        };

        let recipients = roster.snapshot();
        let mut queued = 0usize;
        for agent in &recipients {
            match agent.enqueue(msg.clone()) {
                Enqueued::Queued => queued += 1,
                Enqueued::Evicted => {
                    tracing::debug!(connection_id = %agent.id(), "recipient evicted during fan-out");
                }
                Enqueued::Closed => {}
            }
        }
        tracing::debug!(
            sender = %msg.sender,
            recipients = recipients.len(),
            queued,
            "message broadcast"
        );
    }
    tracing::debug!("broadcast dispatch loop exiting");
}
