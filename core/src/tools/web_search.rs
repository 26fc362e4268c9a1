//! Web search tool
//!
//! Offline stub: the sandbox has no network egress beyond the LLM
//! backend, so this returns a fixed JSON document that names itself as a
//! stub. Swapping in a real provider only means replacing `invoke`.

use super::{JsonMap, Tool, ToolSchema};
use async_trait::async_trait;

const DEFAULT_MAX_RESULTS: u64 = 3;

/// Placeholder web search returning structured stub results
pub struct WebSearchTool;

impl WebSearchTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WebSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &'static str {
        "web_search"
    }

    fn description(&self) -> &'static str {
        "Search the web for information (stub provider)"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(self.name(), self.description())
            .param("query", "string", true)
            .param("max_results", "integer", false)
    }

    async fn invoke(&self, args: &JsonMap) -> Result<String, String> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| "expected string parameter 'query'".to_string())?;

        let max_results = args
            .get("max_results")
            .and_then(|v| v.as_u64())
            .unwrap_or(DEFAULT_MAX_RESULTS);

        let results: Vec<serde_json::Value> = (0..max_results.min(DEFAULT_MAX_RESULTS))
            .map(|i| {
                serde_json::json!({
                    "title": format!("Result {} for '{}'", i + 1, query),
                    "url": format!("https://example.com/search/{}", i + 1),
                    "snippet": "No live search provider is configured in this sandbox.",
                })
            })
            .collect();

        let body = serde_json::json!({
            "query": query,
            "results": results,
            "note": "stub provider - configure a search integration for live results",
        });

        serde_json::to_string_pretty(&body).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(json: serde_json::Value) -> JsonMap {
        json.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn returns_valid_json_reflecting_the_query() {
        let tool = WebSearchTool::new();
        let out = tool
            .invoke(&args(serde_json::json!({"query": "best coffee in Paris"})))
            .await
            .unwrap();
        let data: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(data["query"], "best coffee in Paris");
        assert!(data["results"].is_array());
        assert!(data["note"].as_str().unwrap().contains("stub"));
    }

    #[tokio::test]
    async fn max_results_caps_the_list() {
        let tool = WebSearchTool::new();
        let out = tool
            .invoke(&args(serde_json::json!({"query": "rust", "max_results": 1})))
            .await
            .unwrap();
        let data: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(data["results"].as_array().unwrap().len(), 1);
    }
}
