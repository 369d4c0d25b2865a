//! # socketmap-protocol
//!
//! Wire protocol implementation for the Postfix socketmap lookup protocol.
//!
//! This crate provides:
//! - Netstring framing (`<length>:<payload>,`) with bounded buffering
//! - Request parsing (`<map-name> <key>`)
//! - Typed replies (`OK`, `TEMP`, `NOTFOUND`, `TIMEOUT`, `PERM`)
//! - Protocol errors and constants

pub mod codec;
pub mod error;
pub mod frame;
pub mod message;

pub use codec::{Decoder, Encoder};
pub use error::ProtocolError;
pub use frame::{Frame, LENGTH_SEPARATOR, TERMINATOR};
pub use message::{Reply, ReplyType, Request};

/// Default port for the socketmap server.
pub const DEFAULT_PORT: u16 = 42002;

/// Maximum frame payload size in bytes.
pub const MAX_FRAME_SIZE: usize = 65535;

/// Maximum number of digits accepted in a length prefix.
pub const MAX_LENGTH_DIGITS: usize = 10;
