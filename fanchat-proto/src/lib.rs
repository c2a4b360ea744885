//! Shared protocol definitions for the `fanchat` wire format.

pub mod codec;
pub mod message;
