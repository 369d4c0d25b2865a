//! TCP server implementation.

use crate::backend::Backend;
use crate::config::Config;
use crate::error::ServerError;
use crate::handler::RequestHandler;
use crate::session::{Session, SessionState};
use bytes::BytesMut;
use parking_lot::Mutex;
use socketmap_protocol::{Decoder, Encoder, ProtocolError, Reply, DEFAULT_PORT, MAX_FRAME_SIZE};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

/// Read chunk size for connection sockets.
const READ_CHUNK_SIZE: usize = 8192;

/// Sent in place of a reply whose frame would exceed the size limit.
const OVERSIZED_REPLY_MESSAGE: &str = "reply exceeds maximum frame size";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Idle connection timeout (`None` = never time out).
    pub idle_timeout: Option<Duration>,
    /// Maximum frame payload size, applied to requests and replies.
    pub max_frame_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_PORT),
            idle_timeout: Some(Duration::from_secs(300)),
            max_frame_size: MAX_FRAME_SIZE,
        }
    }
}

impl ServerConfig {
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Default::default()
        }
    }

    /// Sets the idle timeout.
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Sets the maximum frame payload size.
    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }
}

impl From<&Config> for ServerConfig {
    fn from(config: &Config) -> Self {
        Self {
            bind_addr: config.network.bind_addr,
            idle_timeout: config.network.idle_timeout(),
            max_frame_size: config.protocol.max_frame_size,
        }
    }
}

/// Server statistics.
#[derive(Debug, Default)]
pub struct ServerStats {
    pub connections_total: AtomicU64,
    pub connections_active: AtomicU64,
    /// Well-formed requests dispatched to the backend.
    pub requests_total: AtomicU64,
    /// Frames whose payload was not a request.
    pub malformed_total: AtomicU64,
    /// Lookups answered with `TEMP` because the backend failed.
    pub backend_errors_total: AtomicU64,
    /// Connections that ended with an error.
    pub errors_total: AtomicU64,
}

/// Socketmap TCP server.
pub struct Server {
    config: ServerConfig,
    handler: Arc<RequestHandler>,
    stats: Arc<ServerStats>,
    shutdown: broadcast::Sender<()>,
    running: AtomicBool,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl Server {
    /// Creates a new server answering lookups from `backend`.
    pub fn new(config: ServerConfig, backend: Arc<dyn Backend>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let stats = Arc::new(ServerStats::default());
        let handler = RequestHandler::new(backend).with_stats(stats.clone());
        Self {
            config,
            handler: Arc::new(handler),
            stats,
            shutdown: shutdown_tx,
            running: AtomicBool::new(false),
            local_addr: Mutex::new(None),
        }
    }

    /// Binds the configured address and serves until shutdown.
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serves connections accepted on an already bound listener.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        let local_addr = listener.local_addr()?;
        *self.local_addr.lock() = Some(local_addr);

        // Subscribe before flagging as running so no shutdown is missed.
        let mut shutdown_rx = self.shutdown.subscribe();
        self.running.store(true, Ordering::SeqCst);
        tracing::info!("Server listening on {}", local_addr);

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((tcp_stream, addr)) => {
                            self.stats.connections_total.fetch_add(1, Ordering::Relaxed);
                            self.stats.connections_active.fetch_add(1, Ordering::Relaxed);

                            if let Err(e) = tcp_stream.set_nodelay(true) {
                                tracing::debug!("[{}] Failed to set TCP_NODELAY: {}", addr, e);
                            }

                            let handler = self.handler.clone();
                            let stats = self.stats.clone();
                            let config = self.config.clone();
                            let mut conn_shutdown = self.shutdown.subscribe();

                            tokio::spawn(async move {
                                let result = Self::handle_connection(
                                    tcp_stream,
                                    addr,
                                    handler,
                                    config,
                                    &mut conn_shutdown,
                                )
                                .await;

                                match result {
                                    Ok(()) | Err(ServerError::ShuttingDown) => {}
                                    Err(e) => {
                                        tracing::debug!("Connection {} error: {}", addr, e);
                                        stats.errors_total.fetch_add(1, Ordering::Relaxed);
                                    }
                                }

                                stats.connections_active.fetch_sub(1, Ordering::Relaxed);
                                tracing::info!("Client disconnected: {}", addr);
                            });
                        }
                        Err(e) => {
                            tracing::error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Server shutting down");
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Drives one connection through the read / dispatch / reply cycle.
    ///
    /// Returns `Ok` when the peer disconnects or the connection idles out, and
    /// `ServerError::ShuttingDown` when the server stops. Framing errors and
    /// write failures end the connection with an error.
    pub async fn handle_connection<S>(
        mut stream: S,
        addr: SocketAddr,
        handler: Arc<RequestHandler>,
        config: ServerConfig,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<(), ServerError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut session = Session::new(addr);
        tracing::info!("Client connected: {} (session={})", addr, session.id);

        let result = Self::run_session(
            &mut stream,
            &mut session,
            &handler,
            &config,
            shutdown,
        )
        .await;

        session.close();
        tracing::debug!(
            "[{}] Session closed after {} requests ({:?})",
            addr,
            session.request_count(),
            session.age()
        );
        result
    }

    async fn run_session<S>(
        stream: &mut S,
        session: &mut Session,
        handler: &RequestHandler,
        config: &ServerConfig,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<(), ServerError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let addr = session.remote_addr;
        let mut decoder = Decoder::with_max_frame_size(config.max_frame_size);
        let mut buf = [0u8; READ_CHUNK_SIZE];

        loop {
            tokio::select! {
                result = stream.read(&mut buf) => {
                    match result {
                        Ok(0) => {
                            tracing::debug!("[{}] Connection closed by client", addr);
                            return Ok(());
                        }
                        Ok(n) => {
                            tracing::debug!("[{}] Received {} bytes", addr, n);
                            session.touch();
                            decoder.extend(&buf[..n]);
                        }
                        Err(e) => {
                            tracing::debug!("[{}] Read error: {}", addr, e);
                            return Err(ServerError::Io(e));
                        }
                    }
                }

                _ = idle_sleep(config.idle_timeout) => {
                    tracing::debug!(
                        "[{}] Idle timeout after {:?}",
                        addr,
                        session.idle_duration()
                    );
                    return Ok(());
                }

                _ = shutdown.recv() => {
                    tracing::debug!("[{}] Shutdown signal received", addr);
                    return Err(ServerError::ShuttingDown);
                }
            }

            // Answer every complete frame before reading again.
            loop {
                let frame = match decoder.decode_frame() {
                    Ok(Some(frame)) => frame,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!("[{}] Framing error, closing connection: {}", addr, e);
                        return Err(e.into());
                    }
                };

                tracing::debug!("[{}] Frame: {} bytes", addr, frame.payload.len());

                let Some(reply) = handler.handle(session, &frame.payload).await else {
                    continue;
                };

                session.set_state(SessionState::Replying);
                let reply_bytes = encode_reply(&reply, config.max_frame_size, addr)?;

                tracing::debug!(
                    "[{}] Reply: {} ({} bytes)",
                    addr,
                    reply.reply_type,
                    reply_bytes.len()
                );
                stream.write_all(&reply_bytes).await?;
                session.set_state(SessionState::Reading);
            }
        }
    }

    /// Initiates server shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(());
    }

    /// Returns whether the server is accepting connections.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Returns the bound address once the server is listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }

    /// Returns server statistics.
    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }

    /// Returns the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Encodes a reply, substituting a `TEMP` reply when it does not fit a frame.
fn encode_reply(
    reply: &Reply,
    max_frame_size: usize,
    addr: SocketAddr,
) -> Result<BytesMut, ServerError> {
    match Encoder::encode_reply_with_limit(reply, max_frame_size) {
        Ok(bytes) => Ok(bytes),
        Err(ProtocolError::FrameTooLarge { size, max }) => {
            tracing::warn!(
                "[{}] {} reply of {} bytes exceeds frame limit {}",
                addr,
                reply.reply_type,
                size,
                max
            );
            let fallback = Reply::temp(OVERSIZED_REPLY_MESSAGE);
            match Encoder::encode_reply_with_limit(&fallback, max_frame_size) {
                Ok(bytes) => Ok(bytes),
                // Bare `TEMP ` is the smallest reply the protocol allows.
                Err(_) => Ok(Encoder::encode_reply(&Reply::temp(""))?),
            }
        }
        Err(e) => Err(e.into()),
    }
}

async fn idle_sleep(timeout: Option<Duration>) {
    match timeout {
        Some(timeout) => tokio::time::sleep(timeout).await,
        None => std::future::pending().await,
    }
}
