//! Agent core - the think-act-observe loop
//!
//! [`core::Agent`] owns one conversation and turns model output into
//! validated tool invocations; [`parser`] is the pure text layer in front
//! of it. Everything the loop needs from the outside world comes through
//! two seams: [`crate::llm::ChatBackend`] for completions and [`TurnGate`]
//! for event emission and the blocking approval gate.

pub mod core;
pub mod parser;

pub use self::core::{Agent, AgentState};
pub use self::parser::{parse_turn, ParsedTurn};

use crate::error::Result;
use crate::tools::JsonMap;
use async_trait::async_trait;

/// One validated tool call extracted from an assistant reply.
///
/// Consumed at most once; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: JsonMap,
}

/// The loop's window to whoever is driving it.
///
/// The endpoint implements this over the protocol channel; the host never
/// sees it. `request_approval` is the loop's only suspension point: it
/// blocks until a human decision arrives, and while it does, the caller
/// performs no other protocol I/O.
#[async_trait]
pub trait TurnGate: Send {
    /// Model reasoning that preceded a tool call.
    async fn on_thinking(&mut self, content: &str) -> Result<()>;

    /// Result text of one tool invocation.
    async fn on_tool_output(&mut self, content: &str) -> Result<()>;

    /// Ask a human whether a gated invocation may run. `Ok(false)` denies.
    async fn request_approval(&mut self, invocation: &ToolInvocation) -> Result<bool>;
}
