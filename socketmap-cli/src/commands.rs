//! Command execution.

use crate::Commands;
use colored::Colorize;
use socketmap_client::Client;
use socketmap_protocol::{Reply, ReplyType};

/// Formatted result of a one-shot command.
pub struct Outcome {
    pub output: String,
    /// False when the reply was anything other than `OK`.
    pub success: bool,
}

/// Executes a command and returns the formatted output.
pub async fn execute(client: &Client, cmd: Commands) -> Result<Outcome, Box<dyn std::error::Error>> {
    match cmd {
        Commands::Repl => unreachable!(),

        Commands::Query { map, key } => {
            let reply = client.lookup(&map, &key).await?;
            Ok(Outcome {
                success: reply.is_ok(),
                output: format_reply(&reply),
            })
        }
    }
}

/// Renders a reply with its type coloured by outcome.
pub fn format_reply(reply: &Reply) -> String {
    let label = reply.reply_type.as_str();
    let label = match reply.reply_type {
        ReplyType::Ok => label.green().bold(),
        ReplyType::NotFound => label.yellow().bold(),
        ReplyType::Temp | ReplyType::Timeout => label.magenta().bold(),
        ReplyType::Perm => label.red().bold(),
    };

    if reply.value.is_empty() {
        label.to_string()
    } else {
        format!("{} {}", label, reply.value)
    }
}
