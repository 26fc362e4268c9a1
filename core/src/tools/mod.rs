//! Tool implementations for the agent
//!
//! A closed registry of named operations the model can request. Tools
//! never panic and never raise past this boundary: every outcome is a
//! human/LLM-readable string, with error strings prefixed `Error` so the
//! model can tell them apart from results.

pub mod fs;
pub mod list_files;
pub mod notes;
pub mod shell;
pub mod system;
pub mod web_search;

pub use fs::{ReadFileTool, WriteFileTool};
pub use list_files::ListFilesTool;
pub use notes::ManageNotesTool;
pub use shell::ExecuteCommandTool;
pub use system::GetSystemInfoTool;
pub use web_search::WebSearchTool;

use crate::config::Config;
use crate::workspace::WorkspaceJail;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// JSON object carrying a tool invocation's keyword arguments.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// One declared parameter of a tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    /// JSON schema type name ("string", "integer", "number", "boolean")
    #[serde(rename = "type")]
    pub type_name: String,
    pub required: bool,
}

/// Schema describing a tool to the LLM backend.
///
/// Derived once at startup from the registered tools; immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: BTreeMap<String, ParamSpec>,
}

impl ToolSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: BTreeMap::new(),
        }
    }

    /// Declare a parameter. `type_name` is a JSON schema type.
    pub fn param(mut self, name: &str, type_name: &str, required: bool) -> Self {
        self.parameters.insert(
            name.to_string(),
            ParamSpec {
                type_name: type_name.to_string(),
                required,
            },
        );
        self
    }

    /// Render in the function-calling format chat backends expect.
    pub fn to_function_json(&self) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for (name, spec) in &self.parameters {
            properties.insert(
                name.clone(),
                serde_json::json!({ "type": spec.type_name }),
            );
            if spec.required {
                required.push(serde_json::Value::String(name.clone()));
            }
        }
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": {
                    "type": "object",
                    "properties": properties,
                    "required": required,
                },
            },
        })
    }

    /// Check `args` against declared parameters. Returns a description of
    /// the first mismatch, if any.
    pub fn validate(&self, args: &JsonMap) -> std::result::Result<(), String> {
        for (name, spec) in &self.parameters {
            match args.get(name) {
                None if spec.required => {
                    return Err(format!("missing required parameter '{}'", name));
                }
                None => {}
                Some(value) => {
                    let ok = match spec.type_name.as_str() {
                        "string" => value.is_string(),
                        "integer" => value.is_i64() || value.is_u64(),
                        "number" => value.is_number(),
                        "boolean" => value.is_boolean(),
                        "array" => value.is_array(),
                        _ => true,
                    };
                    if !ok {
                        return Err(format!(
                            "parameter '{}' should be a {}",
                            name, spec.type_name
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

/// A named operation the model can invoke.
///
/// The `invoke` contract is total: implementations return `Err(message)`
/// for anything that goes wrong and never panic on bad input.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn schema(&self) -> ToolSchema;
    async fn invoke(&self, args: &JsonMap) -> std::result::Result<String, String>;
}

/// Result of one tool invocation, as fed back into the conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub output: String,
    pub is_error: bool,
}

impl ToolOutcome {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            is_error: false,
        }
    }

    pub fn error(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            is_error: true,
        }
    }
}

/// Closed mapping from tool name to handler.
pub struct ToolRegistry {
    tools: BTreeMap<&'static str, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Empty registry; used directly by tests that register probes.
    pub fn empty() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// The full fixed tool set, jailed to `jail`.
    pub fn with_defaults(jail: WorkspaceJail, config: &Config) -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(ReadFileTool::new(jail.clone())));
        registry.register(Arc::new(WriteFileTool::new(jail.clone())));
        registry.register(Arc::new(ListFilesTool::new(jail.clone())));
        registry.register(Arc::new(ExecuteCommandTool::new(config.command_timeout())));
        registry.register(Arc::new(GetSystemInfoTool::new()));
        registry.register(Arc::new(ManageNotesTool::new(jail)));
        registry.register(Arc::new(WebSearchTool::new()));
        registry
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name(), tool);
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Schemas for every registered tool, in stable name order.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|t| t.schema()).collect()
    }

    /// Invoke a tool by name. Never raises: unknown names, argument
    /// mismatches, and tool faults all come back as error outcomes.
    pub async fn invoke(&self, name: &str, args: &JsonMap) -> ToolOutcome {
        let Some(tool) = self.tools.get(name) else {
            return ToolOutcome::error(format!("Error: Unknown tool '{}'", name));
        };

        if let Err(reason) = tool.schema().validate(args) {
            return ToolOutcome::error(format!(
                "Error: Invalid arguments for '{}': {}",
                name, reason
            ));
        }

        match tool.invoke(args).await {
            Ok(output) => ToolOutcome::ok(output),
            Err(message) => {
                log::debug!("[TOOLS] '{}' failed: {}", name, message);
                ToolOutcome::error(format!("Error executing '{}': {}", name, message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &'static str {
            "echo"
        }
        fn description(&self) -> &'static str {
            "Echo the input back"
        }
        fn schema(&self) -> ToolSchema {
            ToolSchema::new(self.name(), self.description()).param("text", "string", true)
        }
        async fn invoke(&self, args: &JsonMap) -> std::result::Result<String, String> {
            Ok(args["text"].as_str().unwrap_or_default().to_string())
        }
    }

    fn args(json: serde_json::Value) -> JsonMap {
        json.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error_outcome() {
        let registry = ToolRegistry::empty();
        let outcome = registry.invoke("nope", &JsonMap::new()).await;
        assert!(outcome.is_error);
        assert!(outcome.output.contains("Unknown tool 'nope'"));
    }

    #[tokio::test]
    async fn missing_required_argument_is_reported() {
        let mut registry = ToolRegistry::empty();
        registry.register(Arc::new(EchoTool));
        let outcome = registry.invoke("echo", &JsonMap::new()).await;
        assert!(outcome.is_error);
        assert!(outcome.output.contains("missing required parameter 'text'"));
    }

    #[tokio::test]
    async fn type_mismatch_is_reported() {
        let mut registry = ToolRegistry::empty();
        registry.register(Arc::new(EchoTool));
        let outcome = registry.invoke("echo", &args(serde_json::json!({"text": 7}))).await;
        assert!(outcome.is_error);
        assert!(outcome.output.contains("should be a string"));
    }

    #[tokio::test]
    async fn valid_invocation_passes_through() {
        let mut registry = ToolRegistry::empty();
        registry.register(Arc::new(EchoTool));
        let outcome = registry
            .invoke("echo", &args(serde_json::json!({"text": "hi"})))
            .await;
        assert_eq!(outcome, ToolOutcome::ok("hi"));
    }

    #[test]
    fn function_json_shape() {
        let schema = ToolSchema::new("read_file", "Read a file")
            .param("path", "string", true)
            .param("limit", "integer", false);
        let json = schema.to_function_json();
        assert_eq!(json["function"]["name"], "read_file");
        assert_eq!(json["function"]["parameters"]["properties"]["path"]["type"], "string");
        assert_eq!(json["function"]["parameters"]["required"][0], "path");
    }
}
