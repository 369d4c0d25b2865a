//! # socketmap-client
//!
//! Client library for socketmap servers.
//!
//! This crate provides:
//! - Async TCP connection with connect and request timeouts
//! - Framed lookups decoded into typed replies
//! - A high-level `Client` with `OK`/`NOTFOUND` value mapping

pub mod client;
pub mod connection;
pub mod error;

pub use client::Client;
pub use connection::{Connection, ConnectionConfig};
pub use error::ClientError;
