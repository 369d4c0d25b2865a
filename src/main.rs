//! socketmap - Postfix socketmap lookup server
//!
//! Serves `<map> <key>` lookups over the netstring-framed socketmap protocol.

use socketmap_server::{Config, Server, ServerConfig};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration (from file if SOCKETMAP_CONFIG is set, then env overrides)
    let config = match Config::load() {
        Ok(c) => {
            if let Ok(path) = std::env::var("SOCKETMAP_CONFIG") {
                tracing::info!("Loaded config from {}", path);
            }
            c
        }
        Err(e) => {
            tracing::error!("Failed to load config: {}", e);
            return Err(e.into());
        }
    };

    tracing::info!("Starting socketmap server");
    tracing::info!("  Bind address: {}", config.network.bind_addr);
    match config.network.idle_timeout() {
        Some(timeout) => tracing::info!("  Idle timeout: {:?}", timeout),
        None => tracing::info!("  Idle timeout: disabled"),
    }
    tracing::info!("  Max frame size: {} bytes", config.protocol.max_frame_size);

    let table_sizes: Vec<String> = config
        .backend
        .maps
        .iter()
        .map(|(name, entries)| format!("{}={}", name, entries.len()))
        .collect();
    if table_sizes.is_empty() {
        tracing::warn!("  Maps: none configured, every lookup will answer PERM");
    } else {
        tracing::info!("  Maps: {}", table_sizes.join(", "));
    }
    match config.backend.lookup_timeout() {
        Some(timeout) => tracing::info!("  Lookup timeout: {:?}", timeout),
        None => tracing::info!("  Lookup timeout: none"),
    }

    let backend = config.backend.build();
    let server = Arc::new(Server::new(ServerConfig::from(&config), backend));

    let mut server_handle = {
        let server = server.clone();
        tokio::spawn(async move { server.run().await })
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Received shutdown signal");
            server.shutdown();
        }
        result = &mut server_handle => {
            // Listener failed before any signal (e.g. address in use).
            result??;
            return Ok(());
        }
    }

    server_handle.await??;

    let stats = server.stats();
    tracing::info!(
        "Served {} requests over {} connections",
        stats.requests_total.load(Ordering::Relaxed),
        stats.connections_total.load(Ordering::Relaxed)
    );

    Ok(())
}
