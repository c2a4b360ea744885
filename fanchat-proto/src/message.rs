//! Wire format message type for the `fanchat` protocol.
//!
//! A [`ChatMessage`] is the only record that crosses the wire in either
//! direction: clients send it to the relay, and the relay broadcasts it
//! back to every connected client unchanged.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A chat message tagged with the identity of its sender.
///
/// Messages carry no identity beyond their content. Two messages with the
/// same sender and text are distinct deliveries and are relayed
/// independently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Display name chosen by the sending client.
    pub sender: String,
    /// Message body.
    pub text: String,
}

impl ChatMessage {
    /// Creates a new message from `sender` with body `text`.
    pub fn new(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            text: text.into(),
        }
    }
}

impl fmt::Display for ChatMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.sender, self.text)
    }
}
