//! Ollama chat client
//!
//! Non-streaming `/api/chat` calls against an Ollama-compatible endpoint.
//! Tool schemas ride along in the request so tool-capable models can emit
//! call markers; the reply is surfaced as plain assistant text either way.

use super::{ChatBackend, ChatMessage};
use crate::error::{Result, WardenError};
use crate::tools::ToolSchema;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Client for an Ollama-compatible chat endpoint
pub struct OllamaClient {
    base_url: String,
    model: String,
    http: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatPayload<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    message: ReplyMessage,
}

#[derive(Debug, Default, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: String,
}

impl OllamaClient {
    /// Build a client for `base_url` (e.g. `http://localhost:11434`).
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("warden/0.2")
            .build()
            .map_err(|e| WardenError::BackendUnavailable {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(OllamaClient {
            base_url,
            model: model.into(),
            http,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatBackend for OllamaClient {
    async fn complete(&self, history: &[ChatMessage], tools: &[ToolSchema]) -> Result<String> {
        let payload = ChatPayload {
            model: &self.model,
            messages: history,
            stream: false,
            tools: tools.iter().map(ToolSchema::to_function_json).collect(),
        };

        let url = format!("{}/api/chat", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| WardenError::BackendUnavailable {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WardenError::BackendStatus {
                status: status.as_u16(),
                message: truncate(&body, 300),
            });
        }

        let reply: ChatReply =
            response
                .json()
                .await
                .map_err(|e| WardenError::BackendUnavailable {
                    message: format!("unreadable backend reply: {}", e),
                })?;

        Ok(reply.message.content)
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() > max_len {
        let cut = s
            .char_indices()
            .take_while(|(i, _)| *i < max_len)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        format!("{}...", &s[..cut])
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = OllamaClient::new(
            "http://localhost:11434/",
            "llama3.2",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
        assert_eq!(client.model(), "llama3.2");
    }

    #[test]
    fn payload_omits_empty_tool_list() {
        let payload = ChatPayload {
            model: "llama3.2",
            messages: &[ChatMessage::user("hi")],
            stream: false,
            tools: Vec::new(),
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(!json.contains("\"tools\""));
        assert!(json.contains("\"stream\":false"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 300), "short");
        let long = "x".repeat(400);
        assert!(truncate(&long, 300).ends_with("..."));
    }
}
