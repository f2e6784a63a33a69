//! Error types for transformer-client.

use std::time::Duration;

use thiserror::Error;

/// Main error type for all client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The caller passed something the protocol cannot express.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The request item does not fit in a single message.
    #[error("Resources exceeded: message would be larger than {max} bytes")]
    ResourceExceeded { max: usize },

    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No reply arrived within the receive timeout.
    #[error("Receive timeout of {0:?} reached")]
    ReceiveTimeout(Duration),

    /// The connection is closed and could not be re-established.
    #[error("Not connected to the service")]
    NotConnected,

    /// Protocol error (truncated item, unknown tag, chunk type mismatch, etc.).
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl ClientError {
    /// Whether this error closed the connection.
    ///
    /// The next send attempts a reconnect when this is `true`.
    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self,
            ClientError::Io(_) | ClientError::ReceiveTimeout(_) | ClientError::NotConnected
        )
    }
}

/// Result type alias using ClientError.
pub type Result<T> = std::result::Result<T, ClientError>;
