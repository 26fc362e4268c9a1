//! LLM backend interface
//!
//! Conversation history types plus the `ChatBackend` seam the agent loop
//! talks through. The production implementation is [`client::OllamaClient`];
//! tests substitute scripted backends.

pub mod client;

pub use client::OllamaClient;

use crate::error::Result;
use crate::tools::ToolSchema;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Role of the message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System message (instructions for the model)
    System,
    /// User message
    User,
    /// Assistant message (model response)
    Assistant,
    /// Tool message (result from tool execution)
    Tool,
}

/// A single message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender
    pub role: MessageRole,
    /// Content of the message
    pub content: String,
    /// Which tool produced this message, for tool-role entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl ChatMessage {
    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage {
            role: MessageRole::System,
            content: content.into(),
            tool_name: None,
        }
    }

    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: MessageRole::User,
            content: content.into(),
            tool_name: None,
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        ChatMessage {
            role: MessageRole::Assistant,
            content: content.into(),
            tool_name: None,
        }
    }

    /// Create a new tool-result message
    pub fn tool(tool_name: impl Into<String>, content: impl Into<String>) -> Self {
        ChatMessage {
            role: MessageRole::Tool,
            content: content.into(),
            tool_name: Some(tool_name.into()),
        }
    }
}

/// Black-box chat/tool-calling API the agent loop submits history to.
///
/// One call per THINK step. Implementations may fail with connection or
/// timeout errors; they must not retry on their own — retry policy belongs
/// to the caller's configuration, not this seam.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Submit the full history plus tool schemas, get the assistant text.
    async fn complete(&self, history: &[ChatMessage], tools: &[ToolSchema]) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_serialize_lowercase() {
        let msg = ChatMessage::tool("list_files", "(empty directory)");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "tool");
        assert_eq!(json["tool_name"], "list_files");
    }

    #[test]
    fn plain_messages_omit_tool_name() {
        let json = serde_json::to_string(&ChatMessage::user("hi")).unwrap();
        assert!(!json.contains("tool_name"));
    }
}
