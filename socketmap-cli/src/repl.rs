//! Interactive REPL.

use crate::commands::format_reply;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};
use socketmap_client::{Client, ClientError};
use std::net::SocketAddr;

const HELP_TEXT: &str = r#"
Available commands:
  help                      Show this help
  <map> <key>               Look up key in map
  lookup <map> <key>        Same as above
  reconnect                 Re-establish the connection

  quit, exit                Exit the REPL

Keys may contain spaces: everything after the map name is the key.
"#;

/// A parsed REPL line.
#[derive(Debug, PartialEq, Eq)]
enum ReplCommand<'a> {
    Help,
    Quit,
    Reconnect,
    Lookup { map: &'a str, key: &'a str },
}

fn parse_line(line: &str) -> Result<ReplCommand<'_>, String> {
    let (head, rest) = match line.split_once(' ') {
        Some((head, rest)) => (head, Some(rest.trim_start())),
        None => (line, None),
    };

    match (head.to_lowercase().as_str(), rest) {
        ("help" | "?", None) => Ok(ReplCommand::Help),
        ("quit" | "exit", None) => Ok(ReplCommand::Quit),
        ("reconnect", None) => Ok(ReplCommand::Reconnect),
        ("lookup", Some(args)) => match args.split_once(' ') {
            Some((map, key)) => Ok(ReplCommand::Lookup { map, key }),
            None => Err("Usage: lookup <map> <key>".to_string()),
        },
        (_, Some(key)) => Ok(ReplCommand::Lookup { map: head, key }),
        (other, None) => Err(format!(
            "Unknown command '{}'. Type 'help' for usage.",
            other
        )),
    }
}

pub async fn run(client: Client, addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "socketmap CLI".bold().cyan());
    println!("Connecting to {}...", addr);

    client.connect().await?;
    println!("{}", "Connected!".green());

    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();
    let mut rl: Editor<(), DefaultHistory> = Editor::with_config(config)?;

    let history_path = std::env::var("HOME")
        .map(|h| std::path::PathBuf::from(h).join(".socketmap_history"))
        .unwrap_or_else(|_| ".socketmap_history".into());
    let _ = rl.load_history(&history_path);

    println!("Type 'help' for available commands.\n");

    loop {
        let prompt = format!("{} ", "socketmap>".cyan());
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match execute_repl_command(&client, line).await {
                    Ok(Some(output)) => println!("{}\n", output),
                    Ok(None) => break,
                    Err(e) => println!("{}: {}\n", "Error".red(), e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                println!("{}: {:?}", "Error".red(), err);
                break;
            }
        }
    }

    let _ = rl.save_history(&history_path);

    let _ = client.close().await;
    println!("{}", "Disconnected.".dimmed());

    Ok(())
}

async fn execute_repl_command(
    client: &Client,
    line: &str,
) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let command = parse_line(line)?;
    tracing::debug!("REPL command: {:?}", command);

    match command {
        ReplCommand::Help => Ok(Some(HELP_TEXT.trim().to_string())),
        ReplCommand::Quit => Ok(None),
        ReplCommand::Reconnect => {
            let _ = client.close().await;
            client.connect().await?;
            Ok(Some("Reconnected.".green().to_string()))
        }
        ReplCommand::Lookup { map, key } => match client.lookup(map, key).await {
            Ok(reply) => Ok(Some(format_reply(&reply))),
            Err(ClientError::NotConnected) => {
                Err("not connected (use 'reconnect')".to_string().into())
            }
            Err(e) if !client.is_connected() => {
                Err(format!("{} (connection dropped, use 'reconnect')", e).into())
            }
            Err(e) => Err(e.into()),
        },
    }
}
