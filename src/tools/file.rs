// ABOUTME: File tools for reading and writing text files
// ABOUTME: Relative paths resolve against the configured working directory

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::fs;
use tracing::info;

use super::{parse_params, Result, Tool, ToolError, ToolParams, ToolSettings};

pub struct ReadFileTool {
    settings: Arc<ToolSettings>,
}

pub struct WriteFileTool {
    settings: Arc<ToolSettings>,
}

#[derive(Debug, Deserialize)]
struct ReadFileParams {
    path: String,
}

#[derive(Debug, Deserialize)]
struct WriteFileParams {
    path: String,
    content: Value,
    #[serde(default)]
    append: bool,
}

impl ReadFileTool {
    pub fn new(settings: Arc<ToolSettings>) -> Self {
        Self { settings }
    }
}

impl WriteFileTool {
    pub fn new(settings: Arc<ToolSettings>) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "readFile"
    }

    fn description(&self) -> &str {
        "Read the text file at `path`"
    }

    async fn invoke(&self, params: ToolParams) -> Result<Value> {
        let params: ReadFileParams = parse_params(self.name(), params)?;
        let path = self.settings.resolve_path(&params.path);

        let contents = fs::read_to_string(&path).await.map_err(|e| {
            ToolError::Failed(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Ok(Value::String(contents))
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "writeFile"
    }

    fn description(&self) -> &str {
        "Write `content` to `path`, creating parent directories (`append` to extend)"
    }

    async fn invoke(&self, params: ToolParams) -> Result<Value> {
        let params: WriteFileParams = parse_params(self.name(), params)?;
        let path = self.settings.resolve_path(&params.path);

        let content = match params.content {
            Value::String(text) => text,
            other => serde_json::to_string_pretty(&other).map_err(|e| ToolError::InvalidParams {
                tool_id: self.name().to_string(),
                message: e.to_string(),
            })?,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        if params.append {
            use tokio::io::AsyncWriteExt;
            let mut file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await?;
            file.write_all(content.as_bytes()).await?;
            file.flush().await?;
        } else {
            fs::write(&path, content.as_bytes()).await?;
        }

        info!("Wrote {} bytes to {}", content.len(), path.display());

        Ok(json!({
            "path": path.display().to_string(),
            "bytes": content.len(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn settings_in(dir: &std::path::Path) -> Arc<ToolSettings> {
        Arc::new(ToolSettings {
            working_dir: Some(dir.to_path_buf()),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let temp_dir = tempdir().unwrap();
        let settings = settings_in(temp_dir.path());

        let mut params = ToolParams::new();
        params.insert("path".to_string(), json!("nested/out.txt"));
        params.insert("content".to_string(), json!("hello"));
        let written = WriteFileTool::new(Arc::clone(&settings))
            .invoke(params)
            .await
            .unwrap();
        assert_eq!(written["bytes"], json!(5));

        let mut params = ToolParams::new();
        params.insert("path".to_string(), json!("nested/out.txt"));
        let contents = ReadFileTool::new(settings).invoke(params).await.unwrap();
        assert_eq!(contents, json!("hello"));
    }

    #[tokio::test]
    async fn test_append_mode() {
        let temp_dir = tempdir().unwrap();
        let settings = settings_in(temp_dir.path());
        let tool = WriteFileTool::new(Arc::clone(&settings));

        for line in ["a\n", "b\n"] {
            let mut params = ToolParams::new();
            params.insert("path".to_string(), json!("log.txt"));
            params.insert("content".to_string(), json!(line));
            params.insert("append".to_string(), json!(true));
            tool.invoke(params).await.unwrap();
        }

        let contents = std::fs::read_to_string(temp_dir.path().join("log.txt")).unwrap();
        assert_eq!(contents, "a\nb\n");
    }

    #[tokio::test]
    async fn test_read_missing_file_fails() {
        let temp_dir = tempdir().unwrap();
        let mut params = ToolParams::new();
        params.insert("path".to_string(), json!("absent.txt"));

        let result = ReadFileTool::new(settings_in(temp_dir.path()))
            .invoke(params)
            .await;
        assert!(matches!(result, Err(ToolError::Failed(_))));
    }
}
