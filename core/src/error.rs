//! Structured error types for Warden
//!
//! One taxonomy for the whole coordination core: backend faults, parse
//! ambiguity, tool-level failures, protocol violations, and worker
//! lifecycle problems each get their own variant so callers can decide
//! what ends a turn and what ends the session.

use std::time::Duration;
use thiserror::Error;

/// Primary error type for Warden operations
#[derive(Error, Debug)]
pub enum WardenError {
    // =========================================================================
    // LLM Backend Errors
    // =========================================================================
    /// Backend unreachable, timed out, or returned garbage
    #[error("backend unavailable: {message}")]
    BackendUnavailable { message: String },

    /// Backend answered with a non-success HTTP status
    #[error("backend error: {status} - {message}")]
    BackendStatus { status: u16, message: String },

    // =========================================================================
    // Agent Loop Errors
    // =========================================================================
    /// Per-prompt turn cap exceeded
    #[error("turn limit reached ({max_turns} turns). Task aborted to prevent a runaway loop")]
    TurnLimit { max_turns: usize },

    /// Invalid arguments for a tool (missing or ill-typed required field)
    #[error("invalid arguments for '{tool_name}': {reason}")]
    InvalidToolArguments { tool_name: String, reason: String },

    // =========================================================================
    // Protocol / Transport Errors
    // =========================================================================
    /// Bad JSON or unrecognized message on the host<->sandbox channel
    #[error("malformed protocol message: {message}")]
    ProtocolMalformed { message: String },

    /// The channel to the peer closed mid-conversation
    #[error("protocol channel closed")]
    ChannelClosed,

    // =========================================================================
    // Worker Lifecycle Errors
    // =========================================================================
    /// Worker process could not be spawned
    #[error("failed to start worker: {reason}")]
    WorkerStartFailed { reason: String },

    /// Worker did not report ready within the startup window
    #[error("worker startup timed out after {duration:?}")]
    StartupTimeout { duration: Duration },

    /// Worker died while the session still needed it
    #[error("worker terminated unexpectedly")]
    WorkerTerminated,

    // =========================================================================
    // Configuration / Path Errors
    // =========================================================================
    /// Invalid configuration
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Path guard rejection
    #[error("path '{path}' escapes workspace root")]
    PathEscapes { path: String },

    // =========================================================================
    // External Error Wrappers
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WardenError {
    /// Whether this error ends the whole session rather than a single turn.
    ///
    /// Backend faults end one turn; the session stays usable for a new
    /// prompt. Transport and lifecycle faults mean the worker is gone.
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            Self::ChannelClosed
                | Self::WorkerStartFailed { .. }
                | Self::StartupTimeout { .. }
                | Self::WorkerTerminated
        )
    }
}

/// Result type alias using WardenError
pub type Result<T> = std::result::Result<T, WardenError>;
