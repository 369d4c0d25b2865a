//! High-level client API.

use crate::connection::{Connection, ConnectionConfig};
use crate::error::ClientError;
use socketmap_protocol::{Reply, ReplyType};
use std::net::SocketAddr;
use std::sync::Arc;

/// High-level client for socketmap servers.
pub struct Client {
    conn: Arc<Connection>,
}

impl Client {
    /// Creates a new client with the given configuration.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            conn: Arc::new(Connection::new(config)),
        }
    }

    /// Creates a client with default settings and connects it.
    pub async fn connect_to(addr: SocketAddr) -> Result<Self, ClientError> {
        let client = Self::new(ConnectionConfig::new(addr));
        client.connect().await?;
        Ok(client)
    }

    /// Connects to the server.
    pub async fn connect(&self) -> Result<(), ClientError> {
        self.conn.connect().await
    }

    /// Returns whether the client is connected.
    pub fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    /// Closes the connection.
    pub async fn close(&self) -> Result<(), ClientError> {
        self.conn.close().await
    }

    /// Returns the underlying connection.
    pub fn connection(&self) -> Arc<Connection> {
        self.conn.clone()
    }

    /// Looks up `key` in map `name`, returning the raw typed reply.
    pub async fn lookup(&self, name: &str, key: &str) -> Result<Reply, ClientError> {
        self.conn.lookup(name, key).await
    }

    /// Looks up `key` in map `name`.
    ///
    /// Returns `Some(value)` for `OK`, `None` for `NOTFOUND`, and
    /// [`ClientError::Reply`] for `TEMP`, `TIMEOUT` and `PERM`.
    pub async fn lookup_value(&self, name: &str, key: &str) -> Result<Option<String>, ClientError> {
        let reply = self.lookup(name, key).await?;
        match reply.reply_type {
            ReplyType::Ok => Ok(Some(reply.value)),
            ReplyType::NotFound => Ok(None),
            reply_type => Err(ClientError::Reply {
                reply_type,
                message: reply.value,
            }),
        }
    }
}
