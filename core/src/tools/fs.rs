//! Filesystem tools - read and write files inside the jail

use super::{JsonMap, Tool, ToolSchema};
use crate::workspace::WorkspaceJail;
use async_trait::async_trait;

const MAX_FILE_SIZE: u64 = 10_000_000; // 10MB max read

fn required_str<'a>(args: &'a JsonMap, key: &str) -> Result<&'a str, String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("expected string parameter '{}'", key))
}

/// Tool for reading files
pub struct ReadFileTool {
    jail: WorkspaceJail,
}

impl ReadFileTool {
    pub fn new(jail: WorkspaceJail) -> Self {
        Self { jail }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &'static str {
        "read_file"
    }

    fn description(&self) -> &'static str {
        "Read and return the contents of a file in the workspace"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(self.name(), self.description()).param("path", "string", true)
    }

    async fn invoke(&self, args: &JsonMap) -> Result<String, String> {
        let path = required_str(args, "path")?;
        let resolved = self.jail.resolve(path).map_err(|e| e.to_string())?;

        if resolved.is_dir() {
            return Err(format!("'{}' is a directory, not a file", path));
        }

        let metadata = tokio::fs::metadata(&resolved)
            .await
            .map_err(|e| format!("cannot access '{}': {}", path, e))?;
        if metadata.len() > MAX_FILE_SIZE {
            return Err(format!(
                "file too large: {} bytes (max {})",
                metadata.len(),
                MAX_FILE_SIZE
            ));
        }

        tokio::fs::read_to_string(&resolved)
            .await
            .map_err(|e| format!("cannot read '{}': {}", path, e))
    }
}

/// Tool for writing files
pub struct WriteFileTool {
    jail: WorkspaceJail,
}

impl WriteFileTool {
    pub fn new(jail: WorkspaceJail) -> Self {
        Self { jail }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &'static str {
        "write_file"
    }

    fn description(&self) -> &'static str {
        "Write content to a file in the workspace, creating directories as needed"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(self.name(), self.description())
            .param("path", "string", true)
            .param("content", "string", true)
    }

    async fn invoke(&self, args: &JsonMap) -> Result<String, String> {
        let path = required_str(args, "path")?;
        let content = required_str(args, "content")?;
        let resolved = self.jail.resolve(path).map_err(|e| e.to_string())?;

        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("cannot create directory: {}", e))?;
        }

        tokio::fs::write(&resolved, content)
            .await
            .map_err(|e| format!("cannot write '{}': {}", path, e))?;

        Ok(format!("File written successfully: {}", resolved.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, WorkspaceJail) {
        let temp = TempDir::new().unwrap();
        let jail = WorkspaceJail::new(temp.path()).unwrap();
        (temp, jail)
    }

    fn args(json: serde_json::Value) -> JsonMap {
        json.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn write_then_read_round_trip() {
        let (_temp, jail) = setup();
        let write = WriteFileTool::new(jail.clone());
        let read = ReadFileTool::new(jail);

        let result = write
            .invoke(&args(serde_json::json!({"path": "a/b.txt", "content": "hello"})))
            .await
            .unwrap();
        assert!(result.contains("File written successfully"));

        let content = read
            .invoke(&args(serde_json::json!({"path": "a/b.txt"})))
            .await
            .unwrap();
        assert_eq!(content, "hello");
    }

    #[tokio::test]
    async fn read_missing_file_is_an_error() {
        let (_temp, jail) = setup();
        let read = ReadFileTool::new(jail);
        let err = read
            .invoke(&args(serde_json::json!({"path": "nope.txt"})))
            .await
            .unwrap_err();
        assert!(err.contains("cannot access"));
    }

    #[tokio::test]
    async fn read_directory_is_an_error() {
        let (_temp, jail) = setup();
        std::fs::create_dir(jail.root().join("sub")).unwrap();
        let read = ReadFileTool::new(jail);
        let err = read
            .invoke(&args(serde_json::json!({"path": "sub"})))
            .await
            .unwrap_err();
        assert!(err.contains("is a directory"));
    }

    #[tokio::test]
    async fn escaping_path_is_rejected() {
        let (_temp, jail) = setup();
        let write = WriteFileTool::new(jail);
        let err = write
            .invoke(&args(serde_json::json!({"path": "../evil.txt", "content": "x"})))
            .await
            .unwrap_err();
        assert!(err.contains("escapes workspace root"));
    }
}
