//! Sandbox protocol endpoint
//!
//! Runs inside the sandbox process and turns the agent into a
//! message-driven service: one JSON request per line on stdin, one JSON
//! event per line on stdout. Single-threaded by design — requests are
//! handled strictly in arrival order, and the approval gate suspends the
//! pump until the host answers.
//!
//! Generic over the byte streams so tests can drive the pump through
//! in-memory pipes; production wires it to stdin/stdout via [`run_worker`].

use crate::agent::{Agent, ToolInvocation, TurnGate};
use crate::config::Config;
use crate::error::{Result, WardenError};
use crate::llm::OllamaClient;
use crate::protocol::{decode_request, HostRequest, ProtocolEvent};
use crate::tools::ToolRegistry;
use crate::workspace::WorkspaceJail;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Serialize one event, write it, and flush. Output is never withheld
/// behind a pending read: every event is on the wire before the pump
/// blocks again.
async fn write_event<W>(writer: &mut W, event: &ProtocolEvent) -> Result<()>
where
    W: AsyncWrite + Unpin + Send,
{
    let mut line = serde_json::to_string(event)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Message pump wrapping one [`Agent`].
pub struct SandboxEndpoint<R, W> {
    agent: Agent,
    reader: R,
    writer: W,
    next_request_id: u64,
    exit_requested: bool,
}

impl<R, W> SandboxEndpoint<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(agent: Agent, reader: R, writer: W) -> Self {
        Self {
            agent,
            reader,
            writer,
            next_request_id: 0,
            exit_requested: false,
        }
    }

    /// Run the pump until `exit` or EOF. A single malformed message never
    /// ends the loop; only the channel closing does.
    pub async fn run(mut self) -> Result<()> {
        write_event(&mut self.writer, &ProtocolEvent::status("ready")).await?;

        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line).await? == 0 {
                log::info!("[WORKER] stdin closed, shutting down");
                break;
            }
            if line.trim().is_empty() {
                continue;
            }

            match decode_request(&line) {
                Err(message) => {
                    write_event(&mut self.writer, &ProtocolEvent::error(message)).await?;
                }
                Ok(HostRequest::Prompt { content }) => {
                    if content.trim().is_empty() {
                        write_event(&mut self.writer, &ProtocolEvent::error("Empty prompt"))
                            .await?;
                        continue;
                    }
                    self.handle_prompt(&content).await?;
                    if self.exit_requested {
                        write_event(&mut self.writer, &ProtocolEvent::status("exiting")).await?;
                        break;
                    }
                }
                Ok(HostRequest::Reset {}) => {
                    self.agent.reset();
                    write_event(&mut self.writer, &ProtocolEvent::status("reset")).await?;
                }
                Ok(HostRequest::Exit {}) => {
                    write_event(&mut self.writer, &ProtocolEvent::status("exiting")).await?;
                    break;
                }
                Ok(HostRequest::ApprovalResponse { request_id, .. }) => {
                    // No approval is pending outside a prompt.
                    write_event(
                        &mut self.writer,
                        &ProtocolEvent::error(format!(
                            "no approval pending (request_id {})",
                            request_id
                        )),
                    )
                    .await?;
                }
            }
        }

        self.writer.flush().await?;
        Ok(())
    }

    /// Drive one agent turn, ending with exactly one terminal
    /// `response` or `error` event.
    async fn handle_prompt(&mut self, content: &str) -> Result<()> {
        let Self {
            agent,
            reader,
            writer,
            next_request_id,
            exit_requested,
        } = self;

        let mut gate = EndpointGate {
            reader: &mut *reader,
            writer: &mut *writer,
            next_request_id,
            exit_requested,
        };

        let result = agent.run_turn(content, &mut gate).await;

        match result {
            Ok(answer) => {
                write_event(writer, &ProtocolEvent::Response { content: answer }).await
            }
            Err(e) => {
                log::warn!("[WORKER] turn failed: {}", e);
                write_event(writer, &ProtocolEvent::error(e.to_string())).await
            }
        }
    }
}

/// The agent loop's view of the protocol channel during one turn.
struct EndpointGate<'a, R, W> {
    reader: &'a mut R,
    writer: &'a mut W,
    next_request_id: &'a mut u64,
    exit_requested: &'a mut bool,
}

#[async_trait]
impl<R, W> TurnGate for EndpointGate<'_, R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn on_thinking(&mut self, content: &str) -> Result<()> {
        write_event(
            self.writer,
            &ProtocolEvent::Thinking {
                content: content.to_string(),
            },
        )
        .await
    }

    async fn on_tool_output(&mut self, content: &str) -> Result<()> {
        write_event(
            self.writer,
            &ProtocolEvent::ToolOutput {
                content: content.to_string(),
            },
        )
        .await
    }

    /// Emit an approval request and block until the matching response.
    ///
    /// The host is synchronized on the same request id, so the only
    /// expected inbound message is the answer; everything else is
    /// reported and skipped without losing the pending request.
    async fn request_approval(&mut self, invocation: &ToolInvocation) -> Result<bool> {
        *self.next_request_id += 1;
        let request_id = *self.next_request_id;

        write_event(
            self.writer,
            &ProtocolEvent::ApprovalRequest {
                request_id,
                tool_name: invocation.name.clone(),
                arguments: serde_json::Value::Object(invocation.arguments.clone()),
            },
        )
        .await?;

        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line).await? == 0 {
                return Err(WardenError::ChannelClosed);
            }
            if line.trim().is_empty() {
                continue;
            }

            match decode_request(&line) {
                Ok(HostRequest::ApprovalResponse {
                    request_id: answered,
                    approved,
                }) => {
                    if answered == request_id {
                        return Ok(approved);
                    }
                    write_event(
                        self.writer,
                        &ProtocolEvent::error(format!(
                            "approval id mismatch: expected {}, got {}",
                            request_id, answered
                        )),
                    )
                    .await?;
                }
                Ok(HostRequest::Exit {}) => {
                    // Treat as a denial so the turn can end with a
                    // well-formed terminal event, then stop the pump.
                    *self.exit_requested = true;
                    return Ok(false);
                }
                Ok(_) => {
                    write_event(
                        self.writer,
                        &ProtocolEvent::error(format!("approval {} still pending", request_id)),
                    )
                    .await?;
                }
                Err(message) => {
                    write_event(self.writer, &ProtocolEvent::error(message)).await?;
                }
            }
        }
    }
}

/// Build the production agent and run the endpoint on stdin/stdout.
/// This is the container entrypoint.
pub async fn run_worker(config: Config) -> Result<()> {
    let jail = WorkspaceJail::new(&config.workspace)?;
    let registry = ToolRegistry::with_defaults(jail.clone(), &config);
    let backend = Arc::new(OllamaClient::new(
        &config.backend_url,
        &config.model,
        config.request_timeout(),
    )?);

    let mut agent = Agent::new(backend, registry, &config);
    if let Some(context) = Agent::load_system_context(&jail) {
        agent = agent.with_system_context(context);
    }

    log::info!(
        "[WORKER] starting: model={} backend={} workspace={}",
        config.model,
        config.backend_url,
        jail.root().display()
    );

    let reader = BufReader::new(tokio::io::stdin());
    let writer = tokio::io::stdout();
    SandboxEndpoint::new(agent, reader, writer).run().await
}
