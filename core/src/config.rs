//! Configuration management
//!
//! One flat config struct for both sides of the session: the host reads it
//! to launch the sandbox, the worker reads it to build the agent. Loaded
//! from a YAML file when one exists, then overridden by environment
//! variables and finally by CLI flags.

use crate::error::{Result, WardenError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default model used when nothing else is configured.
pub const DEFAULT_MODEL: &str = "llama3.2";
/// Default Ollama endpoint as seen from the host.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:11434";
/// Default sandbox image name.
pub const DEFAULT_IMAGE: &str = "warden:dev";

/// Top-level configuration for a Warden session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model name passed to the LLM backend
    pub model: String,

    /// Base URL of the LLM backend (Ollama-compatible)
    pub backend_url: String,

    /// Directory tree all file and command operations are jailed to
    pub workspace: PathBuf,

    /// Sandbox image the worker runs in
    pub image: String,

    /// Tools that require a synchronous human yes/no before execution
    pub approval_required: Vec<String>,

    /// Maximum think-act-observe turns per prompt
    pub max_turns: usize,

    /// Wall-clock timeout for execute_command, in seconds
    pub command_timeout_secs: u64,

    /// HTTP timeout for one backend completion, in seconds
    pub request_timeout_secs: u64,

    /// How long the host waits for the worker's ready signal, in seconds
    pub startup_timeout_secs: u64,

    /// Grace period between `exit` and a forced kill, in seconds
    pub shutdown_grace_secs: u64,

    /// Worker log file; defaults to the system temp dir so the jail stays
    /// free of supervisor artifacts
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            workspace: default_workspace(),
            image: DEFAULT_IMAGE.to_string(),
            approval_required: vec!["execute_command".to_string()],
            max_turns: 25,
            command_timeout_secs: 30,
            request_timeout_secs: 120,
            startup_timeout_secs: 10,
            shutdown_grace_secs: 5,
            log_file: None,
        }
    }
}

fn default_workspace() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("warden_workspace")
}

impl Config {
    /// Load configuration: defaults, then the YAML file (if present), then
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_file_path() {
            Some(path) if path.exists() => {
                let raw = std::fs::read_to_string(&path)?;
                serde_yml::from_str(&raw).map_err(|e| WardenError::InvalidConfig {
                    message: format!("{}: {}", path.display(), e),
                })?
            }
            _ => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// `~/.config/warden/config.yml` (platform equivalent via `dirs`).
    pub fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("warden").join("config.yml"))
    }

    /// Apply `WARDEN_*` environment overrides on top of the current values.
    pub fn apply_env(&mut self) {
        if let Ok(model) = std::env::var("WARDEN_MODEL") {
            if !model.is_empty() {
                self.model = model;
            }
        }
        if let Ok(url) = std::env::var("WARDEN_BACKEND_URL") {
            if !url.is_empty() {
                self.backend_url = url;
            }
        }
        if let Ok(ws) = std::env::var("WARDEN_WORKSPACE") {
            if !ws.is_empty() {
                self.workspace = PathBuf::from(ws);
            }
        }
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// Whether a tool must pass the human approval gate before running.
    pub fn requires_approval(&self, tool_name: &str) -> bool {
        self.approval_required.iter().any(|t| t == tool_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_gate_execute_command() {
        let config = Config::default();
        assert!(config.requires_approval("execute_command"));
        assert!(!config.requires_approval("read_file"));
        assert_eq!(config.max_turns, 25);
        assert_eq!(config.command_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn yaml_round_trip() {
        let config = Config::default();
        let yaml = serde_yml::to_string(&config).unwrap();
        let parsed: Config = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(parsed.model, config.model);
        assert_eq!(parsed.approval_required, config.approval_required);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let parsed: Config = serde_yml::from_str("model: qwen2\n").unwrap();
        assert_eq!(parsed.model, "qwen2");
        assert_eq!(parsed.backend_url, DEFAULT_BACKEND_URL);
        assert_eq!(parsed.max_turns, 25);
    }
}
