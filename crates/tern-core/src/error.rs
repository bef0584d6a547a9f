//! Error types shared across the Tern crates.
//!
//! Only the transport boundary lives here. Rule, module and configuration
//! errors are defined by the crates that raise them.

use thiserror::Error;

/// Errors raised while handing a message to the outbound transport.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The transport has been shut down and accepts no further messages.
    #[error("transport closed")]
    Closed,

    /// The message could not be delivered.
    #[error("failed to send message to {target}: {reason}")]
    SendFailed {
        /// Destination of the failed message.
        target: String,
        /// Reason for failure.
        reason: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
