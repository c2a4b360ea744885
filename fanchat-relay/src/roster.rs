//! The set of live connections.
//!
//! Every membership change and every fan-out snapshot goes through one
//! [`parking_lot::Mutex`], held only for the map operation itself and never
//! across an `.await`. A snapshot therefore includes every agent inserted
//! before it and no agent removed before it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::agent::{ConnectionAgent, ConnectionId};

/// Live agents keyed by connection id.
#[derive(Debug, Default)]
pub struct Roster {
    agents: Mutex<HashMap<ConnectionId, Arc<ConnectionAgent>>>,
}

impl Roster {
    /// Creates an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an agent. Returns the number of live connections afterwards.
    pub fn insert(&self, agent: Arc<ConnectionAgent>) -> usize {
        let mut agents = self.agents.lock();
        agents.insert(agent.id(), agent);
        agents.len()
    }

    /// Removes an agent, returning it if it was present.
    pub fn remove(&self, id: ConnectionId) -> Option<Arc<ConnectionAgent>> {
        self.agents.lock().remove(&id)
    }

    /// Clones the current membership for fan-out outside the lock.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<ConnectionAgent>> {
        self.agents.lock().values().cloned().collect()
    }

    /// Number of live connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.lock().len()
    }

    /// Whether no connection is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.lock().is_empty()
    }
}
