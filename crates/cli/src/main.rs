mod backend;
mod cli;
mod server_client;
mod terminal;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use crate::backend::{ChatBackend, LocalBackend, RemoteBackend};
use crate::cli::CliArgs;
use crate::server_client::ServerClient;
use crate::terminal::{Input, Terminal};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    relay_core::config::load_dotenv();
    let args = CliArgs::parse();
    let terminal = Terminal::new();

    let mut backend: Box<dyn ChatBackend> = match &args.server {
        Some(url) => {
            let client = ServerClient::new(url);
            client
                .health_check()
                .await
                .with_context(|| format!("relay server at {} is not available", url))?;

            if args.list_sessions {
                let sessions = client.list_sessions().await?;
                terminal.print_sessions(&sessions)?;
                return Ok(());
            }

            if let Some(session_id) = &args.session {
                let turns = client.history(session_id).await?;
                info!(session = %session_id, turns = turns.len(), "Resuming session");
                terminal.print_info(&format!(
                    "Resumed session: {} ({} messages)",
                    session_id,
                    turns.len()
                ))?;
            }
            Box::new(RemoteBackend::new(client, args.session.clone()))
        }
        None => {
            let mut config = relay_core::Config::from_env();
            args.apply_to(&mut config);
            config.validate()?;
            Box::new(LocalBackend::connect(&config, args.session.clone()).await?)
        }
    };

    terminal.print_banner(&backend.describe())?;

    let mut last_session: Option<String> = None;
    loop {
        let message = match terminal.read_input()? {
            Input::Message(text) => text,
            Input::Empty => continue,
            Input::Quit => break,
        };

        let spinner = terminal.start_spinner();
        let result = backend.send(&message).await;
        drop(spinner);

        match result {
            Ok(reply) => {
                terminal.display_reply(&reply)?;
                last_session = Some(reply.session_id);
            }
            Err(e) => terminal.print_error(&format!("{:#}", e))?,
        }
    }

    match last_session {
        Some(id) => terminal.print_info(&format!("Goodbye. Session: {}", id))?,
        None => terminal.print_info("Goodbye.")?,
    }
    Ok(())
}
