//! # socketmap-server
//!
//! TCP server for the Postfix socketmap protocol.
//!
//! This crate provides:
//! - TCP listener with one async task per connection
//! - Per-connection sessions driving the read / dispatch / reply cycle
//! - The `Backend` lookup capability plus in-memory and timeout backends
//! - YAML and environment based configuration

pub mod backend;
pub mod config;
pub mod error;
pub mod handler;
pub mod server;
pub mod session;

pub use backend::{Backend, BackendError, MemoryBackend, TimeoutBackend};
pub use config::{BackendConfig, Config, ConfigError, NetworkConfig, ProtocolConfig};
pub use error::ServerError;
pub use handler::RequestHandler;
pub use server::{Server, ServerConfig, ServerStats};
pub use session::{Session, SessionState};
