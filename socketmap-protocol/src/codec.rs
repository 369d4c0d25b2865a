//! Encoder and decoder for socketmap frames and messages.

use crate::error::ProtocolError;
use crate::frame::Frame;
use crate::message::{Reply, Request};
use crate::MAX_FRAME_SIZE;
use bytes::BytesMut;

/// Encodes requests and replies into frames.
pub struct Encoder;

impl Encoder {
    /// Encodes a request into a frame.
    pub fn encode_request(request: &Request) -> Result<BytesMut, ProtocolError> {
        Frame::new(request.to_payload()).encode()
    }

    /// Encodes a reply into a frame.
    pub fn encode_reply(reply: &Reply) -> Result<BytesMut, ProtocolError> {
        Self::encode_reply_with_limit(reply, MAX_FRAME_SIZE)
    }

    /// Encodes a reply into a frame, enforcing `max_payload`.
    pub fn encode_reply_with_limit(
        reply: &Reply,
        max_payload: usize,
    ) -> Result<BytesMut, ProtocolError> {
        Frame::new(reply.to_payload()).encode_with_limit(max_payload)
    }
}

/// Incremental frame decoder owning the connection buffer.
///
/// Bytes are appended with [`Decoder::extend`]; each successful decode
/// consumes exactly one frame from the front of the buffer and keeps any
/// trailing bytes for the next call.
pub struct Decoder {
    buffer: BytesMut,
    max_frame_size: usize,
}

impl Decoder {
    pub fn new() -> Self {
        Self::with_max_frame_size(MAX_FRAME_SIZE)
    }

    /// Creates a decoder that rejects frames with payloads over `max_frame_size`.
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(1024),
            max_frame_size,
        }
    }

    /// Appends data to the internal buffer.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Attempts to decode the next frame from the buffer.
    pub fn decode_frame(&mut self) -> Result<Option<Frame>, ProtocolError> {
        Frame::decode(&mut self.buffer, self.max_frame_size)
    }

    /// Attempts to decode the next reply from the buffer.
    pub fn decode_reply(&mut self) -> Result<Option<Reply>, ProtocolError> {
        match self.decode_frame()? {
            Some(frame) => Ok(Some(Reply::parse(&frame.payload)?)),
            None => Ok(None),
        }
    }

    /// Returns the configured maximum payload size.
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Returns the number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Clears the internal buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}
