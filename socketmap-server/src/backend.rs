//! Lookup backends.
//!
//! A [`Backend`] resolves `(map name, key)` to a typed [`Reply`]. It is shared
//! by every connection, so implementations must tolerate concurrent calls.
//!
//! Returning `Err` means "temporary failure": the session answers the peer
//! with `TEMP <error>`. Permanent outcomes belong on the success path as
//! `PERM` or `NOTFOUND` replies.

use crate::session::Session;
use async_trait::async_trait;
use parking_lot::RwLock;
use socketmap_protocol::Reply;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Lookup failure reported by a backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Free-form failure description, sent to the peer verbatim.
    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        BackendError::Message(message.into())
    }
}

/// The lookup capability consumed by connection sessions.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Looks up `key` in the map called `name`.
    async fn lookup(&self, session: &Session, name: &str, key: &str)
        -> Result<Reply, BackendError>;
}

#[async_trait]
impl<B: Backend + ?Sized> Backend for Arc<B> {
    async fn lookup(
        &self,
        session: &Session,
        name: &str,
        key: &str,
    ) -> Result<Reply, BackendError> {
        (**self).lookup(session, name, key).await
    }
}

/// In-memory lookup tables.
///
/// - key present: `OK <value>`
/// - map present, key absent: `NOTFOUND`
/// - map absent: `PERM unknown map '<name>'`
#[derive(Default)]
pub struct MemoryBackend {
    maps: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend serving the given tables.
    pub fn from_maps(maps: HashMap<String, HashMap<String, String>>) -> Self {
        Self {
            maps: RwLock::new(maps),
        }
    }

    /// Creates an empty map if it does not exist yet.
    pub fn create_map(&self, name: impl Into<String>) {
        self.maps.write().entry(name.into()).or_default();
    }

    /// Inserts or replaces an entry, creating the map if needed.
    pub fn insert(&self, map: impl Into<String>, key: impl Into<String>, value: impl Into<String>) {
        self.maps
            .write()
            .entry(map.into())
            .or_default()
            .insert(key.into(), value.into());
    }

    /// Removes an entry, returning its value.
    pub fn remove(&self, map: &str, key: &str) -> Option<String> {
        self.maps.write().get_mut(map)?.remove(key)
    }

    /// Returns the number of maps.
    pub fn map_count(&self) -> usize {
        self.maps.read().len()
    }

    /// Returns the total number of entries across all maps.
    pub fn len(&self) -> usize {
        self.maps.read().values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn resolve(&self, name: &str, key: &str) -> Reply {
        let maps = self.maps.read();
        match maps.get(name) {
            Some(map) => match map.get(key) {
                Some(value) => Reply::ok(value.clone()),
                None => Reply::not_found(),
            },
            None => Reply::perm(format!("unknown map '{}'", name)),
        }
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn lookup(
        &self,
        session: &Session,
        name: &str,
        key: &str,
    ) -> Result<Reply, BackendError> {
        let reply = self.resolve(name, key);
        tracing::trace!(
            "[{}] memory lookup {}/{} -> {}",
            session.remote_addr,
            name,
            key,
            reply.reply_type
        );
        Ok(reply)
    }
}

/// Bounds an inner backend's lookups, answering `TIMEOUT` when exceeded.
///
/// The server itself never times out a lookup; wrap a backend in this
/// adapter to opt in.
pub struct TimeoutBackend<B> {
    inner: B,
    timeout: Duration,
}

impl<B: Backend> TimeoutBackend<B> {
    pub fn new(inner: B, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// Returns the configured lookup timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the wrapped backend.
    pub fn inner(&self) -> &B {
        &self.inner
    }
}

#[async_trait]
impl<B: Backend> Backend for TimeoutBackend<B> {
    async fn lookup(
        &self,
        session: &Session,
        name: &str,
        key: &str,
    ) -> Result<Reply, BackendError> {
        match tokio::time::timeout(self.timeout, self.inner.lookup(session, name, key)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    "[{}] lookup {}/{} timed out after {:?}",
                    session.remote_addr,
                    name,
                    key,
                    self.timeout
                );
                Ok(Reply::timeout(format!(
                    "lookup exceeded {} ms",
                    self.timeout.as_millis()
                )))
            }
        }
    }
}
