//! Client error types.

use socketmap_protocol::ReplyType;
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] socketmap_protocol::ProtocolError),

    #[error("not connected")]
    NotConnected,

    #[error("connection closed")]
    ConnectionClosed,

    #[error("request timeout")]
    Timeout,

    /// The server answered with a reply that carries no value.
    #[error("{reply_type}: {message}")]
    Reply {
        reply_type: ReplyType,
        message: String,
    },
}

impl ClientError {
    /// Returns whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Io(_) => true,
            ClientError::Timeout => true,
            ClientError::ConnectionClosed => true,
            ClientError::Reply { reply_type, .. } => {
                matches!(reply_type, ReplyType::Temp | ReplyType::Timeout)
            }
            _ => false,
        }
    }
}
