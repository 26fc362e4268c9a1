//! Agent core implementation
//!
//! Owns the conversation history and drives the think-act-observe loop:
//! submit history plus tool schemas to the backend, parse the reply,
//! route any invocation through the approval gate and the tool registry,
//! feed the observation back, repeat until a plain answer comes out.

use super::parser::parse_turn;
use super::{ToolInvocation, TurnGate};
use crate::config::Config;
use crate::error::{Result, WardenError};
use crate::llm::{ChatBackend, ChatMessage};
use crate::tools::{ToolOutcome, ToolRegistry, ToolSchema};
use crate::workspace::WorkspaceJail;
use std::collections::HashSet;
use std::sync::Arc;

/// Fixed result text for a denied invocation. Fed back into the
/// conversation so the model can react to the refusal.
pub const DENIED_MESSAGE: &str = "Error: Tool execution denied by user.";

/// File in the workspace whose contents become the pinned system message.
pub const SYSTEM_CONTEXT_FILE: &str = "system_context.txt";

/// Where the loop currently is. Strictly sequential: at most one
/// invocation is in flight per agent at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    AwaitingInput,
    Thinking,
    Acting,
    AwaitingApproval,
    Observing,
    Failed,
}

/// The core agent: one conversation, one loop, no ambient state.
pub struct Agent {
    backend: Arc<dyn ChatBackend>,
    registry: ToolRegistry,
    /// Derived from the registry once at construction, immutable after
    schemas: Vec<ToolSchema>,
    approval_required: HashSet<String>,
    max_turns: usize,
    history: Vec<ChatMessage>,
    has_pinned_context: bool,
    state: AgentState,
}

impl Agent {
    pub fn new(backend: Arc<dyn ChatBackend>, registry: ToolRegistry, config: &Config) -> Self {
        let schemas = registry.schemas();
        Self {
            backend,
            registry,
            schemas,
            approval_required: config.approval_required.iter().cloned().collect(),
            max_turns: config.max_turns,
            history: Vec::new(),
            has_pinned_context: false,
            state: AgentState::AwaitingInput,
        }
    }

    /// Pin a system-context message. It leads the history and survives
    /// [`Agent::reset`].
    pub fn with_system_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        if !context.trim().is_empty() {
            self.history.insert(0, ChatMessage::system(context.trim()));
            self.has_pinned_context = true;
        }
        self
    }

    /// Read `system_context.txt` from the workspace, if present and
    /// non-empty. Unreadable files are skipped silently — standing
    /// instructions are optional.
    pub fn load_system_context(jail: &WorkspaceJail) -> Option<String> {
        let path = jail.resolve(SYSTEM_CONTEXT_FILE).ok()?;
        let contents = std::fs::read_to_string(path).ok()?;
        let trimmed = contents.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Clear the conversation. The pinned system message, if any, stays.
    /// Tool-owned persistent state (the notes store) is not touched.
    pub fn reset(&mut self) {
        if self.has_pinned_context {
            self.history.truncate(1);
        } else {
            self.history.clear();
        }
        self.state = AgentState::AwaitingInput;
    }

    /// Run one full turn for `prompt`: think, act, observe, until the
    /// model produces a plain answer or a limit is hit.
    ///
    /// Backend faults transition to `Failed` and surface as an error; the
    /// agent stays usable for a new prompt afterwards.
    pub async fn run_turn(&mut self, prompt: &str, gate: &mut dyn TurnGate) -> Result<String> {
        self.history.push(ChatMessage::user(prompt));

        for _ in 0..self.max_turns {
            self.state = AgentState::Thinking;
            let reply = match self.backend.complete(&self.history, &self.schemas).await {
                Ok(reply) => reply,
                Err(e) => {
                    self.state = AgentState::Failed;
                    return Err(e);
                }
            };

            let parsed = parse_turn(&reply);
            let Some(invocation) = parsed.invocation else {
                // Plain answer: the turn is complete.
                self.history.push(ChatMessage::assistant(&parsed.reasoning));
                self.state = AgentState::AwaitingInput;
                return Ok(parsed.reasoning);
            };

            if !parsed.reasoning.is_empty() {
                gate.on_thinking(&parsed.reasoning).await?;
            }
            self.history.push(ChatMessage::assistant(&parsed.reasoning));

            self.state = AgentState::Acting;
            let outcome = self.act(&invocation, gate).await?;

            self.state = AgentState::Observing;
            gate.on_tool_output(&outcome.output).await?;
            self.history
                .push(ChatMessage::tool(&invocation.name, &outcome.output));
        }

        self.state = AgentState::AwaitingInput;
        Err(WardenError::TurnLimit {
            max_turns: self.max_turns,
        })
    }

    /// Execute one invocation, passing the approval gate first when the
    /// tool is classified sensitive. Denials never reach the tool layer.
    async fn act(
        &mut self,
        invocation: &ToolInvocation,
        gate: &mut dyn TurnGate,
    ) -> Result<ToolOutcome> {
        let gated = self.registry.has(&invocation.name)
            && self.approval_required.contains(&invocation.name);

        if gated {
            self.state = AgentState::AwaitingApproval;
            let approved = gate.request_approval(invocation).await?;
            if !approved {
                log::info!("[AGENT] '{}' denied by user", invocation.name);
                return Ok(ToolOutcome::error(DENIED_MESSAGE));
            }
            self.state = AgentState::Acting;
        }

        Ok(self
            .registry
            .invoke(&invocation.name, &invocation.arguments)
            .await)
    }
}
