//! Session-level error type.

use crate::transport::TransportError;

/// Why a client session ended unsuccessfully.
///
/// A clean close by the client is not an error; [`Relay::accept`] returns
/// `Ok(())` in that case.
///
/// [`Relay::accept`]: crate::relay::Relay::accept
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Reading from the client failed.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    /// The relay closed the connection while it was still being read,
    /// for example because its outbound queue overflowed.
    #[error("connection evicted by the relay")]
    Evicted,
}
