//! Session controller
//!
//! Host-side supervisor of one sandboxed worker process: launches it with
//! piped stdio, confirms readiness, relays prompts and approval answers
//! in, streams protocol events out, and tears the worker down on every
//! exit path — gracefully when it cooperates, forcibly when it doesn't.

use crate::config::Config;
use crate::error::{Result, WardenError};
use crate::protocol::{HostRequest, ProtocolEvent};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::timeout;
use uuid::Uuid;

/// Mount point of the workspace inside the sandbox image.
pub const SANDBOX_WORKSPACE: &str = "/home/agent/workspace";

/// How one worker process gets launched.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    pub image: String,
    pub workspace: PathBuf,
    pub backend_url: String,
    pub model: String,
    /// Unique per session so stray containers are attributable
    pub container_name: String,
    pub startup_timeout: Duration,
    pub shutdown_grace: Duration,
    command_override: Option<Vec<String>>,
}

impl SandboxConfig {
    pub fn from_config(config: &Config) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self {
            image: config.image.clone(),
            workspace: config.workspace.clone(),
            backend_url: config.backend_url.clone(),
            model: config.model.clone(),
            container_name: format!("warden-{}", &suffix[..8]),
            startup_timeout: config.startup_timeout(),
            shutdown_grace: config.shutdown_grace(),
            command_override: None,
        }
    }

    /// Replace `docker run` with an arbitrary argv — local workers
    /// (`--local`) and tests use this.
    pub fn with_command(mut self, argv: Vec<String>) -> Self {
        self.command_override = Some(argv);
        self
    }

    /// Argument vector for `docker run`.
    pub fn docker_args(&self) -> Vec<String> {
        vec![
            "run".to_string(),
            "--rm".to_string(),
            "--name".to_string(),
            self.container_name.clone(),
            "-e".to_string(),
            format!("WARDEN_BACKEND_URL={}", self.backend_url),
            "-e".to_string(),
            format!("WARDEN_MODEL={}", self.model),
            "-e".to_string(),
            format!("WARDEN_WORKSPACE={}", SANDBOX_WORKSPACE),
            "-v".to_string(),
            format!("{}:{}", self.workspace.display(), SANDBOX_WORKSPACE),
            "-i".to_string(),
            self.image.clone(),
        ]
    }

    fn command(&self) -> Command {
        match &self.command_override {
            Some(argv) => {
                let mut command = Command::new(&argv[0]);
                command.args(&argv[1..]);
                command
            }
            None => {
                let mut command = Command::new("docker");
                command.args(self.docker_args());
                command
            }
        }
    }
}

/// Supervises one worker process for the session's lifetime.
pub struct SessionController {
    config: SandboxConfig,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stdout: Option<BufReader<ChildStdout>>,
    /// Events synthesized by the controller itself (broken-pipe writes)
    pending: VecDeque<ProtocolEvent>,
}

impl SessionController {
    pub fn new(config: SandboxConfig) -> Self {
        Self {
            config,
            child: None,
            stdin: None,
            stdout: None,
            pending: VecDeque::new(),
        }
    }

    /// Launch the worker and wait for its ready signal.
    pub async fn start(&mut self) -> Result<()> {
        let mut command = self.config.command();
        command
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            // The OS reaps the worker even if the host aborts without
            // reaching shutdown().
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| WardenError::WorkerStartFailed {
            reason: e.to_string(),
        })?;

        self.stdin = child.stdin.take();
        self.stdout = child.stdout.take().map(BufReader::new);

        // Drain stderr in the background so the worker can never block on
        // a full pipe; lines land in the host log.
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    log::debug!("[SANDBOX stderr] {}", line);
                }
            });
        }

        self.child = Some(child);

        match timeout(self.config.startup_timeout, self.next_event()).await {
            Ok(Some(ProtocolEvent::Status { status })) if status == "ready" => {
                log::info!("[SESSION] worker ready ({})", self.config.container_name);
                Ok(())
            }
            Ok(Some(other)) => {
                self.shutdown().await?;
                Err(WardenError::WorkerStartFailed {
                    reason: format!("unexpected first event: {:?}", other),
                })
            }
            Ok(None) => {
                self.shutdown().await?;
                Err(WardenError::WorkerStartFailed {
                    reason: "worker exited during startup".to_string(),
                })
            }
            Err(_) => {
                let duration = self.config.startup_timeout;
                self.shutdown().await?;
                Err(WardenError::StartupTimeout { duration })
            }
        }
    }

    /// Forward one prompt. Returns as soon as the line is written; the
    /// response arrives later through [`SessionController::next_event`].
    pub async fn send_prompt(&mut self, content: impl Into<String>) -> Result<()> {
        self.send(&HostRequest::Prompt {
            content: content.into(),
        })
        .await
    }

    pub async fn send_reset(&mut self) -> Result<()> {
        self.send(&HostRequest::Reset {}).await
    }

    /// Answer a previously observed approval request.
    pub async fn answer_approval(&mut self, request_id: u64, approved: bool) -> Result<()> {
        self.send(&HostRequest::ApprovalResponse {
            request_id,
            approved,
        })
        .await
    }

    /// Serialize and write one request. A broken pipe is not a raw
    /// transport fault here: it becomes a synthesized error event on the
    /// stream, because the interesting fact is that the worker is gone.
    async fn send(&mut self, request: &HostRequest) -> Result<()> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(WardenError::ChannelClosed);
        };

        let mut line = serde_json::to_string(request)?;
        line.push('\n');

        let write = async {
            stdin.write_all(line.as_bytes()).await?;
            stdin.flush().await
        };

        if let Err(e) = write.await {
            log::warn!("[SESSION] write to worker failed: {}", e);
            self.pending
                .push_back(ProtocolEvent::error("worker terminated unexpectedly"));
        }
        Ok(())
    }

    /// Next event from the worker, in strict emission order. `None` means
    /// the stream ended — the worker exited.
    pub async fn next_event(&mut self) -> Option<ProtocolEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }

        let stdout = self.stdout.as_mut()?;
        let mut line = String::new();
        loop {
            line.clear();
            match stdout.read_line(&mut line).await {
                Ok(0) => return None,
                Ok(_) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str(&line) {
                        Ok(event) => return Some(event),
                        Err(_) => {
                            return Some(ProtocolEvent::error(format!(
                                "unparsable worker output: {}",
                                line.trim()
                            )))
                        }
                    }
                }
                Err(e) => {
                    log::warn!("[SESSION] read from worker failed: {}", e);
                    return None;
                }
            }
        }
    }

    /// Whether the worker process is alive, independent of protocol state.
    pub fn is_running(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Graceful-then-forced teardown. Runs on every exit path, including
    /// mid-prompt cancellation; always releases process and pipe handles.
    pub async fn shutdown(&mut self) -> Result<()> {
        // Best-effort exit message; a dead worker just ignores it.
        if let Some(stdin) = self.stdin.as_mut() {
            let mut line = serde_json::to_string(&HostRequest::Exit {})?;
            line.push('\n');
            let _ = stdin.write_all(line.as_bytes()).await;
            let _ = stdin.flush().await;
        }
        // Closing stdin is the EOF signal for workers mid-read.
        self.stdin = None;

        if let Some(mut child) = self.child.take() {
            match timeout(self.config.shutdown_grace, child.wait()).await {
                Ok(status) => {
                    log::info!("[SESSION] worker exited: {:?}", status.ok());
                }
                Err(_) => {
                    log::warn!("[SESSION] worker ignored exit, killing");
                    let _ = child.kill().await;
                }
            }
        }

        self.stdout = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh_worker(script: &str) -> SandboxConfig {
        let mut config = SandboxConfig::from_config(&Config::default());
        config.startup_timeout = Duration::from_secs(5);
        config.shutdown_grace = Duration::from_secs(2);
        config.with_command(vec![
            "sh".to_string(),
            "-c".to_string(),
            script.to_string(),
        ])
    }

    const READY: &str = r#"echo '{"type":"status","status":"ready"}'"#;

    #[tokio::test]
    async fn start_confirms_ready_and_shutdown_is_clean() {
        let script = format!("{READY}\ncat > /dev/null");
        let mut session = SessionController::new(sh_worker(&script));
        session.start().await.unwrap();
        assert!(session.is_running());
        session.shutdown().await.unwrap();
        assert!(!session.is_running());
    }

    #[tokio::test]
    async fn startup_timeout_fails_the_session() {
        let mut config = sh_worker("sleep 30");
        config.startup_timeout = Duration::from_millis(200);
        let mut session = SessionController::new(config);
        let err = session.start().await.unwrap_err();
        assert!(matches!(err, WardenError::StartupTimeout { .. }));
        assert!(!session.is_running());
    }

    #[tokio::test]
    async fn events_arrive_in_emission_order() {
        let script = format!(
            r#"{READY}
read -r line
echo '{{"type":"thinking","content":"step 1"}}'
echo '{{"type":"tool_output","content":"step 2"}}'
echo '{{"type":"response","content":"step 3"}}'
cat > /dev/null"#
        );
        let mut session = SessionController::new(sh_worker(&script));
        session.start().await.unwrap();
        session.send_prompt("go").await.unwrap();

        let contents: Vec<String> = [
            session.next_event().await.unwrap(),
            session.next_event().await.unwrap(),
            session.next_event().await.unwrap(),
        ]
        .into_iter()
        .map(|event| match event {
            ProtocolEvent::Thinking { content }
            | ProtocolEvent::ToolOutput { content }
            | ProtocolEvent::Response { content } => content,
            other => panic!("unexpected event {:?}", other),
        })
        .collect();
        assert_eq!(contents, vec!["step 1", "step 2", "step 3"]);

        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn unparsable_worker_output_is_surfaced_as_an_error_event() {
        let script = format!("{READY}\necho 'plain text, not json'\ncat > /dev/null");
        let mut session = SessionController::new(sh_worker(&script));
        session.start().await.unwrap();

        match session.next_event().await.unwrap() {
            ProtocolEvent::Error { message } => {
                assert!(message.contains("unparsable worker output"));
            }
            other => panic!("expected error event, got {:?}", other),
        }
        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn worker_death_mid_prompt_ends_the_stream() {
        // End-to-end scenario: the worker dies after accepting a prompt.
        // The stream ends without a terminal response, is_running flips
        // to false, and shutdown still completes.
        let script = format!("{READY}\nread -r line\nexit 7");
        let mut session = SessionController::new(sh_worker(&script));
        session.start().await.unwrap();

        session.send_prompt("doomed").await.unwrap();
        assert_eq!(session.next_event().await, None);

        // The child has exited; give try_wait a beat to observe it.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!session.is_running());
        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn write_to_a_dead_worker_synthesizes_an_error_event() {
        let script = READY.to_string();
        let mut session = SessionController::new(sh_worker(&script));
        session.start().await.unwrap();

        // Wait for the worker to be fully gone.
        for _ in 0..50 {
            if !session.is_running() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(!session.is_running());

        session.send_prompt("anyone there?").await.unwrap();
        match session.next_event().await.unwrap() {
            ProtocolEvent::Error { message } => {
                assert_eq!(message, "worker terminated unexpectedly");
            }
            other => panic!("expected synthesized error, got {:?}", other),
        }
        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn stubborn_worker_is_killed_after_the_grace_period() {
        // Traps cannot help `sh` here: it ignores EOF and keeps sleeping.
        let script = format!("{READY}\nexec sleep 600 < /dev/null");
        let mut config = sh_worker(&script);
        config.shutdown_grace = Duration::from_millis(300);
        let mut session = SessionController::new(config);
        session.start().await.unwrap();

        session.shutdown().await.unwrap();
        assert!(!session.is_running());
    }

    #[test]
    fn docker_args_carry_mount_env_and_image() {
        let config = SandboxConfig::from_config(&Config::default());
        let args = config.docker_args();
        assert_eq!(args[0], "run");
        assert!(args.contains(&"--rm".to_string()));
        assert!(args.iter().any(|a| a.starts_with("WARDEN_BACKEND_URL=")));
        assert!(args.iter().any(|a| a.contains(SANDBOX_WORKSPACE)));
        assert_eq!(args.last(), Some(&config.image));
        assert!(config.container_name.starts_with("warden-"));
    }
}
