//! Command-line entry point for the courier delivery queue
//!
//! - `serve` (the default) runs the dispatcher until interrupted
//! - `send` queues a message for a running server to deliver
//! - `status`, `sent` and `failed` query the store

#![deny(clippy::pedantic, clippy::all, clippy::nursery)]
#![allow(clippy::must_use_candidate)]

#[cfg(not(any(target_os = "macos", unix)))]
compile_error!("Only macos and unix are currently supported");

use std::{
    io::{Read, Write},
    path::PathBuf,
    sync::Arc,
};

use clap::{Parser, Subcommand};
use courier::{controller::Courier, report};
use courier_delivery::{DeliveryQueryService, Dispatcher, LogTransport};
use courier_store::{MessageId, OutboundMessage, StoreConfig};

/// Asynchronous outbound message queue
#[derive(Parser, Debug)]
#[command(name = "courier")]
#[command(about = "Queue and deliver outbound messages", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (overrides discovery)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the dispatcher until interrupted
    Serve,
    #[command(flatten)]
    Client(ClientCommand),
}

/// Commands that work against the store without running the dispatcher
#[derive(Subcommand, Debug)]
enum ClientCommand {
    /// Queue a message for delivery
    Send {
        /// Recipient address
        #[arg(long)]
        to: String,
        /// Message subject
        #[arg(long)]
        subject: String,
        /// Message body (read from stdin when omitted)
        #[arg(long)]
        body: Option<String>,
    },
    /// Show where a message currently stands
    Status {
        /// Message ID
        message_id: String,
    },
    /// List recently sent messages
    Sent {
        /// Maximum number of messages to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// List recently abandoned messages
    Failed {
        /// Maximum number of messages to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => find_config_file()?,
    };
    let courier = Courier::load(&config_path)?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => courier.run().await,
        Commands::Client(command) => {
            let dispatcher = courier.dispatcher(Arc::new(LogTransport))?;
            let result = execute(&courier, &dispatcher, command).await;
            dispatcher.shutdown().await;
            result
        }
    }
}

async fn execute(
    courier: &Courier,
    dispatcher: &Dispatcher,
    command: ClientCommand,
) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout();

    match command {
        ClientCommand::Send { to, subject, body } => {
            if matches!(courier.store_config(), StoreConfig::Memory(_)) {
                eprintln!(
                    "Warning: memory store configured, the message will not outlive this process"
                );
            }

            let body = match body {
                Some(body) => body,
                None => {
                    let mut body = String::new();
                    std::io::stdin().read_to_string(&mut body)?;
                    body
                }
            };

            let id = dispatcher
                .submit(OutboundMessage::new(to, subject, body))
                .await?;
            writeln!(stdout, "{id}")?;
        }
        ClientCommand::Status { message_id } => {
            let id: MessageId = message_id
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid message ID {message_id}: {e}"))?;
            let status = dispatcher.status(&id).await?;
            report::write_status(&mut stdout, &status)?;
        }
        ClientCommand::Sent { limit } => {
            report::write_records(&mut stdout, &dispatcher.list_sent(limit).await?)?;
        }
        ClientCommand::Failed { limit } => {
            report::write_records(&mut stdout, &dispatcher.list_failed(limit).await?)?;
        }
    }

    Ok(())
}

/// Find the configuration file using the following precedence:
/// 1. `COURIER_CONFIG` environment variable
/// 2. ./courier.config.ron (current working directory)
/// 3. /etc/courier/courier.config.ron (system-wide config)
fn find_config_file() -> anyhow::Result<PathBuf> {
    if let Ok(env_path) = std::env::var("COURIER_CONFIG") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        anyhow::bail!(
            "COURIER_CONFIG points to non-existent file: {}",
            path.display()
        );
    }

    let default_paths = [
        PathBuf::from("./courier.config.ron"),
        PathBuf::from("/etc/courier/courier.config.ron"),
    ];

    for path in &default_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let paths_tried = default_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    anyhow::bail!(
        "No configuration file found. Tried:\n  - COURIER_CONFIG environment variable\n{paths_tried}"
    )
}
