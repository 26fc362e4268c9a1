//! List directory contents tool

use super::{JsonMap, Tool, ToolSchema};
use crate::workspace::WorkspaceJail;
use async_trait::async_trait;

/// Tool for listing directory contents inside the jail
pub struct ListFilesTool {
    jail: WorkspaceJail,
}

impl ListFilesTool {
    pub fn new(jail: WorkspaceJail) -> Self {
        Self { jail }
    }
}

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &'static str {
        "list_files"
    }

    fn description(&self) -> &'static str {
        "List files and directories at a path in the workspace"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(self.name(), self.description()).param("path", "string", false)
    }

    async fn invoke(&self, args: &JsonMap) -> Result<String, String> {
        let path = args
            .get("path")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(".");
        let resolved = self.jail.resolve(path).map_err(|e| e.to_string())?;

        if !resolved.is_dir() {
            return Err(format!("'{}' is not a directory", path));
        }

        let mut entries = tokio::fs::read_dir(&resolved)
            .await
            .map_err(|e| format!("cannot read directory '{}': {}", path, e))?;

        let mut names = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let mut name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                name.push('/');
            }
            names.push(name);
        }
        names.sort();

        if names.is_empty() {
            Ok("(empty directory)".to_string())
        } else {
            Ok(names.join("\n"))
        }
    }
}
