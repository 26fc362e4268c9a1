//! Wire protocol for host <-> sandbox communication
//!
//! One JSON object per line in each direction, tagged by `type`. The host
//! sends [`HostRequest`]s down the worker's stdin; the worker answers with
//! [`ProtocolEvent`]s on stdout. Nothing else is ever written to either
//! stream.

use serde::{Deserialize, Serialize};

/// Message from the host to the sandboxed worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostRequest {
    /// One user prompt to run a full agent turn for
    Prompt { content: String },
    /// Clear conversation history (pinned system context survives)
    Reset {},
    /// Graceful shutdown
    Exit {},
    /// Answer to a pending approval request
    ApprovalResponse { request_id: u64, approved: bool },
}

/// Event from the sandboxed worker to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProtocolEvent {
    /// Lifecycle signal ("ready", "reset", "exiting")
    Status { status: String },
    /// Model reasoning emitted before a tool runs
    Thinking { content: String },
    /// Result of one tool invocation
    ToolOutput { content: String },
    /// A sensitive tool needs a human yes/no before it may run
    ApprovalRequest {
        request_id: u64,
        tool_name: String,
        arguments: serde_json::Value,
    },
    /// Terminal answer for one prompt
    Response { content: String },
    /// Terminal failure for one prompt, or a dropped bad message
    Error { message: String },
}

impl ProtocolEvent {
    pub fn status(status: impl Into<String>) -> Self {
        Self::Status {
            status: status.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Whether this event ends the event stream for the current prompt.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Response { .. } | Self::Error { .. })
    }
}

/// Decode one inbound line, distinguishing unparsable JSON from a
/// well-formed object of an unknown kind (they get different error
/// messages on the wire).
pub fn decode_request(line: &str) -> Result<HostRequest, String> {
    let value: serde_json::Value =
        serde_json::from_str(line.trim()).map_err(|_| "invalid request".to_string())?;

    let kind = value
        .get("type")
        .and_then(|t| t.as_str())
        .map(str::to_string);

    match serde_json::from_value::<HostRequest>(value) {
        Ok(request) => Ok(request),
        Err(_) => match kind {
            Some(kind) => Err(format!("unknown request type: {}", kind)),
            None => Err("invalid request".to_string()),
        },
    }
}
