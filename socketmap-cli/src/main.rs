//! socketmap-cli - Command-line interface for socketmap servers
//!
//! Provides both a REPL and one-shot lookups.

mod commands;
mod repl;

use clap::{Parser, Subcommand};
use colored::Colorize;
use socketmap_client::{Client, ConnectionConfig};
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "socketmap-cli")]
#[command(about = "Command-line interface for socketmap lookup servers")]
#[command(version)]
struct Cli {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:42002", env = "SOCKETMAP_SERVER")]
    server: SocketAddr,

    /// Seconds to wait for a reply
    #[arg(short, long, default_value = "30")]
    timeout: u64,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Start interactive REPL
    Repl,

    /// Look up a single key and print the reply
    Query {
        /// Map name
        map: String,

        /// Key to look up
        key: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let config = ConnectionConfig::new(cli.server)
        .with_request_timeout(Duration::from_secs(cli.timeout));
    let client = Client::new(config);

    match cli.command {
        Some(Commands::Repl) | None => {
            repl::run(client, cli.server).await?;
        }
        Some(cmd) => {
            client.connect().await.map_err(|e| {
                eprintln!("{}: {}", "Connection failed".red(), e);
                e
            })?;

            let result = commands::execute(&client, cmd).await;
            let _ = client.close().await;

            match result {
                Ok(outcome) => {
                    println!("{}", outcome.output);
                    if !outcome.success {
                        std::process::exit(1);
                    }
                }
                Err(e) => {
                    eprintln!("{}: {}", "Error".red(), e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
