//! Protocol error types.

use thiserror::Error;

/// Protocol-level errors that can occur during framing or message handling.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid length prefix: {0:?}")]
    InvalidLength(String),

    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    #[error("missing frame terminator: expected ',', got {0:#04x}")]
    MissingTerminator(u8),

    #[error("missing space between map name and key")]
    MissingSeparator,

    #[error("invalid UTF-8 in payload")]
    InvalidUtf8,

    #[error("unknown reply type: {0:?}")]
    UnknownReplyType(String),
}

impl ProtocolError {
    /// Returns whether the byte stream is desynchronized after this error.
    ///
    /// Framing errors leave no recovery point; the connection must be closed.
    /// The remaining variants concern the content of an already extracted
    /// frame and leave the stream usable.
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            ProtocolError::InvalidLength(_)
                | ProtocolError::FrameTooLarge { .. }
                | ProtocolError::MissingTerminator(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framing_classification() {
        assert!(ProtocolError::InvalidLength("x".into()).is_framing());
        assert!(ProtocolError::FrameTooLarge { size: 10, max: 5 }.is_framing());
        assert!(ProtocolError::MissingTerminator(b';').is_framing());

        assert!(!ProtocolError::MissingSeparator.is_framing());
        assert!(!ProtocolError::InvalidUtf8.is_framing());
        assert!(!ProtocolError::UnknownReplyType("MAYBE".into()).is_framing());
    }

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::InvalidLength("1a".to_string());
        assert!(err.to_string().contains("1a"));

        let err = ProtocolError::FrameTooLarge {
            size: 70000,
            max: 65535,
        };
        let msg = err.to_string();
        assert!(msg.contains("70000"));
        assert!(msg.contains("65535"));

        let err = ProtocolError::MissingTerminator(b';');
        assert!(err.to_string().contains("0x3b"));

        let err = ProtocolError::UnknownReplyType("MAYBE".to_string());
        assert!(err.to_string().contains("MAYBE"));

        let err = ProtocolError::InvalidUtf8;
        assert!(err.to_string().contains("UTF-8"));
    }
}
