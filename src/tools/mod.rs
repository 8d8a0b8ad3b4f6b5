// ABOUTME: Tool capability seam and the built-in tool registry
// ABOUTME: The engine only sees ToolInvoker; concrete tools register themselves by name

pub mod calculate;
pub mod echo;
pub mod file;
pub mod shell;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub type ToolParams = Map<String, Value>;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Tool not found: {tool_id}")]
    NotFound { tool_id: String },

    #[error("Invalid parameters for {tool_id}: {message}")]
    InvalidParams { tool_id: String, message: String },

    #[error("{tool_id} timed out after {timeout:?}")]
    Timeout { tool_id: String, timeout: Duration },

    #[error("{0}")]
    Failed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ToolError>;

/// Anything that can run a tool by id. The step executor depends on this
/// trait only, so tests and embedders can supply their own registries.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn invoke(&self, tool_id: &str, params: ToolParams) -> Result<Value>;

    /// Whether `tool_id` can be invoked. Used for load-time warnings only.
    fn has_tool(&self, tool_id: &str) -> bool;
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    async fn invoke(&self, params: ToolParams) -> Result<Value>;
}

/// Settings shared by the built-in tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Base directory for relative paths and shell commands.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    #[serde(default = "default_shell")]
    pub shell: String,
    #[serde(with = "humantime_serde", default = "default_shell_timeout")]
    pub shell_timeout: Duration,
}

fn default_shell() -> String {
    "/bin/sh".to_string()
}

fn default_shell_timeout() -> Duration {
    Duration::from_secs(300)
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            working_dir: None,
            shell: default_shell(),
            shell_timeout: default_shell_timeout(),
        }
    }
}

impl ToolSettings {
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        match &self.working_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in tool.
    pub fn with_builtins(settings: ToolSettings) -> Self {
        let settings = Arc::new(settings);
        let mut registry = Self::new();

        registry.register(echo::EchoTool);
        registry.register(calculate::CalculateTool);
        registry.register(file::ReadFileTool::new(Arc::clone(&settings)));
        registry.register(file::WriteFileTool::new(Arc::clone(&settings)));
        registry.register(shell::ShellTool::new(settings));

        registry
    }

    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.tools.insert(tool.name().to_string(), Arc::new(tool));
    }

    pub fn get(&self, tool_id: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(tool_id).cloned()
    }

    /// Registered tools sorted by name.
    pub fn list(&self) -> Vec<(&str, &str)> {
        let mut tools: Vec<(&str, &str)> = self
            .tools
            .values()
            .map(|tool| (tool.name(), tool.description()))
            .collect();
        tools.sort_by(|a, b| a.0.cmp(b.0));
        tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[async_trait]
impl ToolInvoker for ToolRegistry {
    async fn invoke(&self, tool_id: &str, params: ToolParams) -> Result<Value> {
        match self.tools.get(tool_id) {
            Some(tool) => tool.invoke(params).await,
            None => Err(ToolError::NotFound {
                tool_id: tool_id.to_string(),
            }),
        }
    }

    fn has_tool(&self, tool_id: &str) -> bool {
        self.tools.contains_key(tool_id)
    }
}

/// Deserialize a tool's parameter map into its typed configuration.
pub(crate) fn parse_params<T: DeserializeOwned>(tool_id: &str, params: ToolParams) -> Result<T> {
    serde_json::from_value(Value::Object(params)).map_err(|e| ToolError::InvalidParams {
        tool_id: tool_id.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtin_registry() {
        let registry = ToolRegistry::with_builtins(ToolSettings::default());
        let names: Vec<&str> = registry.list().into_iter().map(|(name, _)| name).collect();

        assert_eq!(
            names,
            vec!["calculate", "echo", "readFile", "shell", "writeFile"]
        );
        assert!(registry.has_tool("calculate"));
        assert!(!registry.has_tool("deploy"));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_an_error() {
        let registry = ToolRegistry::new();
        let result = registry.invoke("deploy", ToolParams::new()).await;

        assert!(matches!(result, Err(ToolError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_registry_dispatches_by_name() {
        let registry = ToolRegistry::with_builtins(ToolSettings::default());
        let mut params = ToolParams::new();
        params.insert("message".to_string(), json!("hello"));

        let value = registry.invoke("echo", params).await.unwrap();
        assert_eq!(value, json!("hello"));
    }

    #[test]
    fn test_resolve_path_against_working_dir() {
        let settings = ToolSettings {
            working_dir: Some(PathBuf::from("/srv/jobs")),
            ..Default::default()
        };

        assert_eq!(settings.resolve_path("out/x.txt"), PathBuf::from("/srv/jobs/out/x.txt"));
        assert_eq!(settings.resolve_path("/etc/hosts"), PathBuf::from("/etc/hosts"));
    }
}
