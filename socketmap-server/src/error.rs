//! Server error types.

use crate::config::ConfigError;
use thiserror::Error;

/// Server errors.
///
/// Every variant is fatal to the connection (or listener) it occurs on.
/// Backend failures never surface here; they are answered with a `TEMP`
/// reply instead.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] socketmap_protocol::ProtocolError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("server shutting down")]
    ShuttingDown,
}
