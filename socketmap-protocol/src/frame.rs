//! Netstring frame format used in both directions.
//!
//! ```text
//! +-----------------+-----+-----------------+-----+
//! | length (ASCII)  | ':' | payload         | ',' |
//! | 1..=10 digits   |     | length bytes    |     |
//! +-----------------+-----+-----------------+-----+
//! ```
//!
//! The length counts payload bytes only. The payload is opaque: framing
//! relies on the length prefix alone and never scans payload content.

use crate::error::ProtocolError;
use crate::{MAX_FRAME_SIZE, MAX_LENGTH_DIGITS};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Separates the length prefix from the payload.
pub const LENGTH_SEPARATOR: u8 = b':';

/// Terminates every frame; not counted in the length prefix.
pub const TERMINATOR: u8 = b',';

/// A single length-prefixed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame payload.
    pub payload: Bytes,
}

impl Frame {
    /// Creates a new frame with the given payload.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// Returns the number of bytes this frame occupies on the wire.
    pub fn encoded_len(&self) -> usize {
        digit_count(self.payload.len()) + self.payload.len() + 2
    }

    /// Encodes the frame, enforcing the default maximum frame size.
    pub fn encode(&self) -> Result<BytesMut, ProtocolError> {
        self.encode_with_limit(MAX_FRAME_SIZE)
    }

    /// Encodes the frame, enforcing `max_payload`.
    pub fn encode_with_limit(&self, max_payload: usize) -> Result<BytesMut, ProtocolError> {
        if self.payload.len() > max_payload {
            return Err(ProtocolError::FrameTooLarge {
                size: self.payload.len(),
                max: max_payload,
            });
        }

        let mut buf = BytesMut::with_capacity(self.encoded_len());
        buf.put_slice(self.payload.len().to_string().as_bytes());
        buf.put_u8(LENGTH_SEPARATOR);
        buf.put_slice(&self.payload);
        buf.put_u8(TERMINATOR);

        Ok(buf)
    }

    /// Decodes a frame from the front of `buf`.
    ///
    /// Returns `Ok(Some(frame))` and removes the frame from `buf` when a
    /// complete frame is buffered, `Ok(None)` if more data is needed (nothing
    /// is consumed), or `Err` when the stream cannot be a valid frame.
    pub fn decode(buf: &mut BytesMut, max_payload: usize) -> Result<Option<Self>, ProtocolError> {
        // The separator can only appear within the first MAX_LENGTH_DIGITS + 1 bytes.
        let window = buf.len().min(MAX_LENGTH_DIGITS + 1);
        let sep = match buf[..window].iter().position(|&b| b == LENGTH_SEPARATOR) {
            Some(pos) => pos,
            None => {
                check_length_prefix(&buf[..window])?;
                return Ok(None);
            }
        };

        let payload_len = parse_length(&buf[..sep])?;
        if payload_len > max_payload {
            return Err(ProtocolError::FrameTooLarge {
                size: payload_len,
                max: max_payload,
            });
        }

        let total_len = sep + 1 + payload_len + 1;
        if buf.len() < total_len {
            return Ok(None);
        }

        let terminator = buf[total_len - 1];
        if terminator != TERMINATOR {
            return Err(ProtocolError::MissingTerminator(terminator));
        }

        buf.advance(sep + 1);
        let payload = buf.split_to(payload_len).freeze();
        buf.advance(1);

        Ok(Some(Self { payload }))
    }
}

/// Validates a (possibly partial) length prefix.
fn check_length_prefix(prefix: &[u8]) -> Result<(), ProtocolError> {
    if prefix.len() > MAX_LENGTH_DIGITS || !prefix.iter().all(u8::is_ascii_digit) {
        return Err(invalid_length(prefix));
    }
    Ok(())
}

/// Parses a complete length prefix.
fn parse_length(prefix: &[u8]) -> Result<usize, ProtocolError> {
    if prefix.is_empty() {
        return Err(invalid_length(prefix));
    }
    check_length_prefix(prefix)?;

    let len = prefix
        .iter()
        .fold(0u64, |acc, &d| acc * 10 + u64::from(d - b'0'));
    Ok(usize::try_from(len).unwrap_or(usize::MAX))
}

fn invalid_length(prefix: &[u8]) -> ProtocolError {
    let shown = &prefix[..prefix.len().min(MAX_LENGTH_DIGITS + 1)];
    ProtocolError::InvalidLength(String::from_utf8_lossy(shown).into_owned())
}

fn digit_count(mut n: usize) -> usize {
    let mut digits = 1;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    digits
}
