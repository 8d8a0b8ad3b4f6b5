// ABOUTME: Shell tool running a command line through the configured interpreter
// ABOUTME: Captures stdout/stderr and enforces its own timeout; non-zero exits are failures

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::{parse_params, Result, Tool, ToolError, ToolParams, ToolSettings};

pub struct ShellTool {
    settings: Arc<ToolSettings>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShellParams {
    command: String,
    #[serde(default)]
    env: HashMap<String, String>,
    #[serde(default)]
    timeout_seconds: Option<u64>,
    /// Exit codes treated as success (defaults to [0])
    #[serde(default = "default_expected_exit_codes")]
    expected_exit_codes: Vec<i32>,
}

fn default_expected_exit_codes() -> Vec<i32> {
    vec![0]
}

impl ShellTool {
    pub fn new(settings: Arc<ToolSettings>) -> Self {
        Self { settings }
    }

    fn build_command(&self, params: &ShellParams) -> Command {
        let mut cmd = Command::new(&self.settings.shell);
        cmd.arg("-c").arg(&params.command);

        for (key, value) in &params.env {
            cmd.env(key, value);
        }

        if let Some(ref working_dir) = self.settings.working_dir {
            cmd.current_dir(working_dir);
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        cmd
    }
}

#[async_trait]
impl Tool for ShellTool {
    fn name(&self) -> &str {
        "shell"
    }

    fn description(&self) -> &str {
        "Run `command` with the configured shell and return stdout, stderr and exit code"
    }

    async fn invoke(&self, params: ToolParams) -> Result<Value> {
        let params: ShellParams = parse_params(self.name(), params)?;
        if params.command.trim().is_empty() {
            return Err(ToolError::InvalidParams {
                tool_id: self.name().to_string(),
                message: "command cannot be empty".to_string(),
            });
        }

        let timeout_duration = params
            .timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(self.settings.shell_timeout);

        info!("Running shell command: {}", params.command);
        debug!("Shell: {} (timeout {:?})", self.settings.shell, timeout_duration);

        let output = match timeout(timeout_duration, self.build_command(&params).output()).await {
            Ok(output) => output?,
            Err(_) => {
                warn!("Shell command timed out after {:?}", timeout_duration);
                return Err(ToolError::Timeout {
                    tool_id: self.name().to_string(),
                    timeout: timeout_duration,
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let exit_code = output.status.code().unwrap_or(-1);

        if !params.expected_exit_codes.contains(&exit_code) {
            let detail = if stderr.trim().is_empty() {
                stdout.trim()
            } else {
                stderr.trim()
            };
            return Err(ToolError::Failed(format!(
                "Command exited with code {}: {}",
                exit_code, detail
            )));
        }

        Ok(json!({
            "stdout": stdout,
            "stderr": stderr,
            "exitCode": exit_code,
        }))
    }
}
