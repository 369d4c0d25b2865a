//! Request dispatch.

use crate::backend::Backend;
use crate::server::ServerStats;
use crate::session::{Session, SessionState};
use socketmap_protocol::{Reply, Request};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Turns decoded frame payloads into replies via the backend.
pub struct RequestHandler {
    backend: Arc<dyn Backend>,
    stats: Arc<ServerStats>,
}

impl RequestHandler {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            stats: Arc::new(ServerStats::default()),
        }
    }

    /// Records request counters into shared server statistics.
    pub fn with_stats(mut self, stats: Arc<ServerStats>) -> Self {
        self.stats = stats;
        self
    }

    /// Returns the statistics this handler records into.
    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }

    /// Handles one frame payload, returning the reply to send.
    ///
    /// Malformed payloads (no space, invalid UTF-8) are logged and yield
    /// `None`. Backend failures become `TEMP` replies carrying the error text.
    pub async fn handle(&self, session: &mut Session, payload: &[u8]) -> Option<Reply> {
        let request = match Request::parse(payload) {
            Ok(request) => request,
            Err(e) => {
                self.stats.malformed_total.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    "[{}] Ignoring malformed request {:?}: {}",
                    session.remote_addr,
                    String::from_utf8_lossy(payload),
                    e
                );
                return None;
            }
        };

        session.set_state(SessionState::Dispatching);
        session.record_request();
        self.stats.requests_total.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            "[{}] Request {}/{} (session={})",
            session.remote_addr,
            request.name,
            request.key,
            session.id
        );

        let reply = match self
            .backend
            .lookup(session, &request.name, &request.key)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                self.stats.backend_errors_total.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    "[{}] Lookup {}/{} failed: {}",
                    session.remote_addr,
                    request.name,
                    request.key,
                    e
                );
                Reply::temp(e.to_string())
            }
        };

        Some(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, MemoryBackend};
    use async_trait::async_trait;
    use socketmap_protocol::ReplyType;

    struct FailingBackend;

    #[async_trait]
    impl Backend for FailingBackend {
        async fn lookup(
            &self,
            _session: &Session,
            _name: &str,
            _key: &str,
        ) -> Result<Reply, BackendError> {
            Err(BackendError::new("db unavailable"))
        }
    }

    fn test_session() -> Session {
        Session::new("127.0.0.1:40000".parse().unwrap())
    }

    fn memory_handler() -> RequestHandler {
        let backend = MemoryBackend::new();
        backend.insert("aliases", "bob", "bob@example.com");
        RequestHandler::new(Arc::new(backend))
    }

    #[tokio::test]
    async fn test_handle_successful_lookup() {
        let handler = memory_handler();
        let mut session = test_session();

        let dispatch = handler.handle(&mut session, b"aliases bob").await;
        assert_eq!(dispatch, Some(Reply::ok("bob@example.com")));
        assert_eq!(session.request_count(), 1);
        assert_eq!(session.state(), SessionState::Dispatching);
    }

    #[tokio::test]
    async fn test_handle_not_found() {
        let handler = memory_handler();
        let mut session = test_session();

        match handler.handle(&mut session, b"aliases carol").await {
            Some(reply) => assert_eq!(reply.reply_type, ReplyType::NotFound),
            None => panic!("expected a reply"),
        }
    }

    #[tokio::test]
    async fn test_handle_backend_error_maps_to_temp() {
        let handler = RequestHandler::new(Arc::new(FailingBackend));
        let mut session = test_session();

        let dispatch = handler.handle(&mut session, b"aliases bob").await;
        assert_eq!(dispatch, Some(Reply::temp("db unavailable")));
        assert_eq!(handler.stats().backend_errors_total.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_handle_single_token_ignored() {
        let handler = memory_handler();
        let mut session = test_session();

        assert_eq!(handler.handle(&mut session, b"aliases").await, None);
        assert_eq!(handler.handle(&mut session, b"").await, None);
        assert_eq!(session.request_count(), 0);
        assert_eq!(session.state(), SessionState::Reading);
        assert_eq!(handler.stats().malformed_total.load(Ordering::Relaxed), 2);
        assert_eq!(handler.stats().requests_total.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_handle_invalid_utf8_ignored() {
        let handler = memory_handler();
        let mut session = test_session();

        assert_eq!(
            handler.handle(&mut session, b"aliases \xff").await,
            None
        );
    }
}
