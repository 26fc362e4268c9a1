//! CLI argument parsing using clap 4.x derive macros

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// A terminal supervisor for an LLM agent running inside a jailed sandbox
///
/// The host process launches a worker in an isolated container, relays
/// prompts and events over stdin/stdout, and gates sensitive tools behind
/// a synchronous yes/no approval.
#[derive(Parser, Debug)]
#[command(name = "warden")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive chat session with the sandboxed agent
    Chat {
        /// LLM model to use (must be available on the backend)
        #[arg(short, long)]
        model: Option<String>,

        /// LLM backend URL (Ollama-compatible)
        #[arg(long)]
        backend_url: Option<String>,

        /// Workspace directory mounted into the sandbox
        #[arg(short, long)]
        workspace: Option<PathBuf>,

        /// Sandbox image to run the worker in
        #[arg(long)]
        image: Option<String>,

        /// Run the worker as a local child process instead of a container
        #[arg(long)]
        local: bool,
    },

    /// Run the sandbox worker endpoint on stdin/stdout
    ///
    /// This is the container entrypoint; `chat --local` also spawns it.
    #[command(hide = true)]
    Worker {
        #[arg(long)]
        model: Option<String>,

        #[arg(long)]
        backend_url: Option<String>,

        #[arg(long)]
        workspace: Option<PathBuf>,
    },
}
