//! Shared test doubles: a scripted backend, a recording gate, and probe
//! tools for asserting what the loop did and did not touch.

use crate::agent::{ToolInvocation, TurnGate};
use crate::error::{Result, WardenError};
use crate::llm::{ChatBackend, ChatMessage};
use crate::tools::{JsonMap, Tool, ToolSchema};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

enum Step {
    Reply(String),
    Fail(String),
}

/// Backend that plays back a fixed script of replies and failures.
pub(crate) struct ScriptedBackend {
    steps: Mutex<VecDeque<Step>>,
    exhausted_error: String,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<&str>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(replies.into_iter().map(|r| Step::Reply(r.to_string())).collect()),
            exhausted_error: "script exhausted".to_string(),
        })
    }

    /// Fails every call with the given message.
    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(VecDeque::new()),
            exhausted_error: message.to_string(),
        })
    }

    /// Fails the first call, then plays back `replies`.
    pub fn failing_then(replies: Vec<&str>) -> Arc<Self> {
        let mut steps: VecDeque<Step> = VecDeque::new();
        steps.push_back(Step::Fail("connection refused".to_string()));
        steps.extend(replies.into_iter().map(|r| Step::Reply(r.to_string())));
        Arc::new(Self {
            steps: Mutex::new(steps),
            exhausted_error: "script exhausted".to_string(),
        })
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn complete(&self, _history: &[ChatMessage], _tools: &[ToolSchema]) -> Result<String> {
        match self.steps.lock().unwrap().pop_front() {
            Some(Step::Reply(reply)) => Ok(reply),
            Some(Step::Fail(message)) => Err(WardenError::BackendUnavailable { message }),
            None => Err(WardenError::BackendUnavailable {
                message: self.exhausted_error.clone(),
            }),
        }
    }
}

/// Gate that records everything and answers approvals with a fixed choice.
pub(crate) struct RecordingGate {
    pub thinking: Vec<String>,
    pub outputs: Vec<String>,
    pub approvals: Vec<ToolInvocation>,
    pub approve: bool,
}

impl RecordingGate {
    pub fn approving() -> Self {
        Self {
            thinking: Vec::new(),
            outputs: Vec::new(),
            approvals: Vec::new(),
            approve: true,
        }
    }

    pub fn denying() -> Self {
        Self {
            approve: false,
            ..Self::approving()
        }
    }
}

#[async_trait]
impl TurnGate for RecordingGate {
    async fn on_thinking(&mut self, content: &str) -> Result<()> {
        self.thinking.push(content.to_string());
        Ok(())
    }

    async fn on_tool_output(&mut self, content: &str) -> Result<()> {
        self.outputs.push(content.to_string());
        Ok(())
    }

    async fn request_approval(&mut self, invocation: &ToolInvocation) -> Result<bool> {
        self.approvals.push(invocation.clone());
        Ok(self.approve)
    }
}

/// Tool that counts its invocations; the zero-call assertions for the
/// approval gate live on top of this.
pub(crate) struct CountingTool {
    name: &'static str,
    output: String,
    pub calls: Arc<AtomicUsize>,
}

impl CountingTool {
    pub fn new(name: &'static str, output: &str) -> Self {
        Self {
            name,
            output: output.to_string(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Tool for CountingTool {
    fn name(&self) -> &'static str {
        self.name
    }
    fn description(&self) -> &'static str {
        "Counts invocations"
    }
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(self.name, "Counts invocations")
    }
    async fn invoke(&self, _args: &JsonMap) -> std::result::Result<String, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.output.clone())
    }
}

/// Tool with a typed required parameter, for argument-mismatch paths.
pub(crate) struct StrictTool;

#[async_trait]
impl Tool for StrictTool {
    fn name(&self) -> &'static str {
        "strict"
    }
    fn description(&self) -> &'static str {
        "Requires an integer count"
    }
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(self.name(), self.description()).param("count", "integer", true)
    }
    async fn invoke(&self, args: &JsonMap) -> std::result::Result<String, String> {
        Ok(format!("counted {}", args["count"]))
    }
}
