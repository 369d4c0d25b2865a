//! Connection management.

use crate::error::ClientError;
use socketmap_protocol::{Decoder, Encoder, Reply, Request, MAX_FRAME_SIZE};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

/// Default read buffer size (8 KiB).
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Minimum read buffer size (1 KiB).
pub const MIN_READ_BUFFER_SIZE: usize = 1024;

/// Maximum read buffer size (1 MiB).
pub const MAX_READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Server address.
    pub addr: SocketAddr,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Time allowed for a reply to arrive after a request is sent.
    pub request_timeout: Duration,
    /// Read buffer size for socket reads.
    pub read_buffer_size: usize,
    /// Largest reply payload accepted from the server.
    pub max_frame_size: usize,
}

impl ConnectionConfig {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_frame_size: MAX_FRAME_SIZE,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.clamp(MIN_READ_BUFFER_SIZE, MAX_READ_BUFFER_SIZE);
        self
    }

    pub fn with_max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }
}

/// Socket plus the bytes received but not yet decoded.
struct Transport {
    stream: TcpStream,
    decoder: Decoder,
}

/// A connection to a socketmap server.
///
/// Requests are strictly sequential: the transport lock is held from writing
/// a request until its reply is decoded.
pub struct Connection {
    config: ConnectionConfig,
    transport: Mutex<Option<Transport>>,
    connected: AtomicBool,
}

impl Connection {
    /// Creates a new connection (not yet connected).
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            transport: Mutex::new(None),
            connected: AtomicBool::new(false),
        }
    }

    /// Returns the connection configuration.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Connects to the server.
    pub async fn connect(&self) -> Result<(), ClientError> {
        tracing::debug!("Connecting to {}...", self.config.addr);

        let stream = tokio::time::timeout(
            self.config.connect_timeout,
            TcpStream::connect(self.config.addr),
        )
        .await
        .map_err(|_| {
            tracing::debug!("Connection timeout");
            ClientError::Timeout
        })?
        .map_err(|e| {
            tracing::debug!("Connection failed: {}", e);
            ClientError::Io(e)
        })?;

        stream.set_nodelay(true).ok();

        *self.transport.lock().await = Some(Transport {
            stream,
            decoder: Decoder::with_max_frame_size(self.config.max_frame_size),
        });
        self.connected.store(true, Ordering::SeqCst);

        tracing::debug!("Connected to {}", self.config.addr);
        Ok(())
    }

    /// Looks up `key` in the map called `name` and returns the server's reply.
    ///
    /// A complete reply frame with an unusable payload is returned as an error
    /// and the connection stays open. Any other failure after the request is
    /// written leaves the stream out of sync, so the connection is dropped and
    /// must be re-established.
    pub async fn lookup(&self, name: &str, key: &str) -> Result<Reply, ClientError> {
        let request = Request::new(name, key);
        let encoded = Encoder::encode_request(&request)?;

        let mut guard = self.transport.lock().await;
        let transport = guard.as_mut().ok_or(ClientError::NotConnected)?;

        tracing::debug!("Sending lookup {}/{} ({} bytes)", name, key, encoded.len());

        let result = tokio::time::timeout(self.config.request_timeout, async {
            transport.stream.write_all(&encoded).await?;
            Self::read_reply(transport, self.config.read_buffer_size).await
        })
        .await
        .unwrap_or_else(|_| {
            tracing::debug!("Lookup {}/{} timed out", name, key);
            Err(ClientError::Timeout)
        });

        match result {
            Ok(reply) => {
                tracing::debug!("Lookup {}/{} -> {}", name, key, reply.reply_type);
                Ok(reply)
            }
            // The whole frame was consumed, so the stream is still in sync.
            Err(ClientError::Protocol(e)) if !e.is_framing() => {
                tracing::debug!("Lookup {}/{} returned an unusable reply: {}", name, key, e);
                Err(ClientError::Protocol(e))
            }
            Err(e) => {
                tracing::debug!("Lookup {}/{} failed, dropping connection: {}", name, key, e);
                *guard = None;
                self.connected.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    async fn read_reply(transport: &mut Transport, buffer_size: usize) -> Result<Reply, ClientError> {
        let mut buf = vec![0u8; buffer_size];

        loop {
            if let Some(reply) = transport.decoder.decode_reply()? {
                return Ok(reply);
            }

            let n = transport.stream.read(&mut buf).await?;
            if n == 0 {
                tracing::debug!("Connection closed by server");
                return Err(ClientError::ConnectionClosed);
            }

            transport.decoder.extend(&buf[..n]);
        }
    }

    /// Returns whether the connection is established.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Closes the connection.
    pub async fn close(&self) -> Result<(), ClientError> {
        self.connected.store(false, Ordering::SeqCst);

        if let Some(mut transport) = self.transport.lock().await.take() {
            tracing::debug!("Shutting down connection to {}", self.config.addr);
            let _ = transport.stream.shutdown().await;
        }

        Ok(())
    }
}
