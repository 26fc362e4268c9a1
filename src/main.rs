//! `warden` - a terminal supervisor for a sandboxed LLM agent
//!
//! The `chat` command runs the host side: it launches a worker in an
//! isolated sandbox, relays prompts in and events out, and collects
//! human approvals for sensitive tools. The hidden `worker` command is
//! the sandbox entrypoint.

use anyhow::{Context, Result};
use clap::Parser;

use crate::cli::{Cli, Commands};
use warden_core::{logger, Config};

mod chat;
mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Chat {
            model,
            backend_url,
            workspace,
            image,
            local,
        } => {
            let mut config = Config::load().context("Failed to load configuration")?;
            if let Some(model) = model {
                config.model = model;
            }
            if let Some(url) = backend_url {
                config.backend_url = url;
            }
            if let Some(workspace) = workspace {
                config.workspace = workspace;
            }
            if let Some(image) = image {
                config.image = image;
            }

            logger::init(config.log_file.clone(), log::LevelFilter::Info)
                .context("Failed to initialize logging")?;

            chat::run(config, local).await
        }

        Commands::Worker {
            model,
            backend_url,
            workspace,
        } => {
            let mut config = Config::load().context("Failed to load configuration")?;
            if let Some(model) = model {
                config.model = model;
            }
            if let Some(url) = backend_url {
                config.backend_url = url;
            }
            if let Some(workspace) = workspace {
                config.workspace = workspace;
            }

            // stdout belongs to the protocol; diagnostics go to the file.
            logger::init(config.log_file.clone(), log::LevelFilter::Info)
                .context("Failed to initialize logging")?;

            warden_core::run_worker(config)
                .await
                .context("Worker failed")
        }
    }
}
