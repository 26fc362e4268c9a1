//! Persistent notes tool
//!
//! A flat `notes.json` inside the workspace. The store belongs to this
//! tool alone — agent resets never touch it.

use super::{JsonMap, Tool, ToolSchema};
use crate::workspace::WorkspaceJail;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const NOTES_FILE: &str = "notes.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Note {
    content: String,
    created_at: String,
}

/// Tool for reading, appending, and clearing persistent notes
pub struct ManageNotesTool {
    jail: WorkspaceJail,
}

impl ManageNotesTool {
    pub fn new(jail: WorkspaceJail) -> Self {
        Self { jail }
    }

    async fn load(&self) -> Result<Vec<Note>, String> {
        let path = self.jail.resolve(NOTES_FILE).map_err(|e| e.to_string())?;
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => {
                serde_json::from_str(&raw).map_err(|e| format!("notes store corrupted: {}", e))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(format!("cannot read notes: {}", e)),
        }
    }

    async fn save(&self, notes: &[Note]) -> Result<(), String> {
        let path = self.jail.resolve(NOTES_FILE).map_err(|e| e.to_string())?;
        let raw = serde_json::to_string_pretty(notes).map_err(|e| e.to_string())?;
        tokio::fs::write(&path, raw)
            .await
            .map_err(|e| format!("cannot write notes: {}", e))
    }
}

#[async_trait]
impl Tool for ManageNotesTool {
    fn name(&self) -> &'static str {
        "manage_notes"
    }

    fn description(&self) -> &'static str {
        "Manage persistent notes: action is 'read', 'append', or 'clear'"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(self.name(), self.description())
            .param("action", "string", true)
            .param("content", "string", false)
    }

    async fn invoke(&self, args: &JsonMap) -> Result<String, String> {
        let action = args
            .get("action")
            .and_then(|v| v.as_str())
            .ok_or_else(|| "expected string parameter 'action'".to_string())?;

        match action {
            "read" => {
                let notes = self.load().await?;
                if notes.is_empty() {
                    return Ok("No notes found.".to_string());
                }
                let mut out = format!("Notes ({}):\n", notes.len());
                for (i, note) in notes.iter().enumerate() {
                    out.push_str(&format!("{}. [{}] {}\n", i + 1, note.created_at, note.content));
                }
                Ok(out)
            }
            "append" => {
                let content = args
                    .get("content")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .trim()
                    .to_string();
                if content.is_empty() {
                    return Err("cannot append an empty note".to_string());
                }
                let mut notes = self.load().await?;
                notes.push(Note {
                    content,
                    created_at: chrono::Local::now().format("%Y-%m-%d %H:%M").to_string(),
                });
                self.save(&notes).await?;
                Ok(format!("Note saved ({} total).", notes.len()))
            }
            "clear" => {
                self.save(&[]).await?;
                Ok("All notes cleared.".to_string())
            }
            other => Err(format!(
                "Unknown action '{}'. Use 'read', 'append', or 'clear'",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ManageNotesTool) {
        let temp = TempDir::new().unwrap();
        let jail = WorkspaceJail::new(temp.path()).unwrap();
        (temp, ManageNotesTool::new(jail))
    }

    fn args(json: serde_json::Value) -> JsonMap {
        json.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn read_empty_store() {
        let (_temp, tool) = setup();
        let out = tool
            .invoke(&args(serde_json::json!({"action": "read"})))
            .await
            .unwrap();
        assert_eq!(out, "No notes found.");
    }

    #[tokio::test]
    async fn append_then_read() {
        let (temp, tool) = setup();
        let out = tool
            .invoke(&args(serde_json::json!({"action": "append", "content": "water the plants"})))
            .await
            .unwrap();
        assert!(out.contains("Note saved"));
        assert!(out.contains('1'));
        assert!(temp.path().join("notes.json").exists());

        tool.invoke(&args(serde_json::json!({"action": "append", "content": "second note"})))
            .await
            .unwrap();

        let out = tool
            .invoke(&args(serde_json::json!({"action": "read"})))
            .await
            .unwrap();
        assert!(out.starts_with("Notes (2):"));
        assert!(out.contains("water the plants"));
        assert!(out.contains("second note"));
    }

    #[tokio::test]
    async fn clear_empties_the_store() {
        let (_temp, tool) = setup();
        tool.invoke(&args(serde_json::json!({"action": "append", "content": "doomed"})))
            .await
            .unwrap();
        tool.invoke(&args(serde_json::json!({"action": "clear"})))
            .await
            .unwrap();
        let out = tool
            .invoke(&args(serde_json::json!({"action": "read"})))
            .await
            .unwrap();
        assert_eq!(out, "No notes found.");
    }

    #[tokio::test]
    async fn empty_append_and_unknown_action_fail() {
        let (_temp, tool) = setup();
        let err = tool
            .invoke(&args(serde_json::json!({"action": "append", "content": "  "})))
            .await
            .unwrap_err();
        assert!(err.contains("empty note"));

        let err = tool
            .invoke(&args(serde_json::json!({"action": "delete"})))
            .await
            .unwrap_err();
        assert!(err.contains("Unknown action"));
    }
}
