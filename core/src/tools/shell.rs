//! Shell command execution tool
//!
//! Runs commands through `sh -c` with an enforced wall-clock timeout so a
//! hung command bounds the loop instead of wedging it. Classified as
//! approval-required by default configuration.

use super::{JsonMap, Tool, ToolSchema};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::timeout;

const MAX_OUTPUT_SIZE: usize = 100_000; // 100KB max output

/// Tool for executing shell commands
pub struct ExecuteCommandTool {
    default_timeout: Duration,
}

impl ExecuteCommandTool {
    pub fn new(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }

    async fn run(&self, cmd: &str, limit: Duration) -> Result<String, String> {
        // kill_on_drop: abandoning the future on timeout must also reap
        // the child, or a hung command would outlive its turn.
        let mut command = tokio::process::Command::new("sh");
        command
            .args(["-c", cmd])
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true);

        let output = match timeout(limit, command.output()).await {
            Ok(result) => result.map_err(|e| format!("command failed: {}", e))?,
            Err(_) => {
                return Err(format!("command timed out after {} seconds", limit.as_secs()));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        let mut result = stdout.into_owned();
        if !stderr.is_empty() {
            if !result.is_empty() {
                result.push('\n');
            }
            result.push_str("[stderr]\n");
            result.push_str(&stderr);
        }

        if result.len() > MAX_OUTPUT_SIZE {
            result.truncate(MAX_OUTPUT_SIZE);
            result.push_str("\n... [output truncated]");
        }

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            return Err(format!("command failed with exit code {}:\n{}", code, result));
        }

        if result.is_empty() {
            Ok("(no output)".to_string())
        } else {
            Ok(result)
        }
    }
}

#[async_trait]
impl Tool for ExecuteCommandTool {
    fn name(&self) -> &'static str {
        "execute_command"
    }

    fn description(&self) -> &'static str {
        "Execute a shell command and return its output"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(self.name(), self.description())
            .param("cmd", "string", true)
            .param("timeout", "integer", false)
    }

    async fn invoke(&self, args: &JsonMap) -> Result<String, String> {
        let cmd = args
            .get("cmd")
            .and_then(|v| v.as_str())
            .ok_or_else(|| "expected string parameter 'cmd'".to_string())?;
        if cmd.trim().is_empty() {
            return Err("empty command".to_string());
        }

        let limit = args
            .get("timeout")
            .and_then(|v| v.as_u64())
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout);

        self.run(cmd, limit).await
    }
}
