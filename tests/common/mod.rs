// ABOUTME: Common utilities and helpers for integration tests
// ABOUTME: Provides spy tool invokers and builders for workflow documents

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;
use tokio::fs;

use toolflow::tools::{Result as ToolResult, ToolError, ToolInvoker, ToolParams};

/// Tool invoker that records every call and can be scripted per tool id.
///
/// - `fail` always errors
/// - `flaky` errors until it has been called `flaky_failures` times
/// - `slow` sleeps for `params.ms` milliseconds, then returns `params.value`
/// - anything else returns `params.value`, or the params object when absent
#[derive(Default)]
pub struct SpyTools {
    calls: Mutex<Vec<(String, ToolParams)>>,
    flaky_failures: usize,
}

impl SpyTools {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flaky_failures(mut self, failures: usize) -> Self {
        self.flaky_failures = failures;
        self
    }

    pub fn calls(&self) -> Vec<(String, ToolParams)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, tool_id: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == tool_id)
            .count()
    }

    pub fn call_order(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(id, params)| match params.get("label").and_then(Value::as_str) {
                Some(label) => label.to_string(),
                None => id.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl ToolInvoker for SpyTools {
    async fn invoke(&self, tool_id: &str, params: ToolParams) -> ToolResult<Value> {
        let call_number = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((tool_id.to_string(), params.clone()));
            calls.iter().filter(|(id, _)| id == tool_id).count()
        };

        match tool_id {
            "fail" => Err(ToolError::Failed("scripted failure".to_string())),
            "flaky" if call_number <= self.flaky_failures => Err(ToolError::Failed(format!(
                "flaky failure {}",
                call_number
            ))),
            "slow" => {
                let ms = params.get("ms").and_then(Value::as_u64).unwrap_or(10);
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok(params.get("value").cloned().unwrap_or(Value::Null))
            }
            _ => Ok(params
                .get("value")
                .cloned()
                .unwrap_or_else(|| Value::Object(params.clone()))),
        }
    }

    fn has_tool(&self, _tool_id: &str) -> bool {
        true
    }
}

pub fn context_of(pairs: &[(&str, Value)]) -> toolflow::ExecutionContext {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

pub struct TestStep {
    pub tool: String,
    pub params: HashMap<String, Value>,
    pub condition: Option<String>,
    pub continue_on_error: bool,
    pub result_name: Option<String>,
}

impl TestStep {
    pub fn new(tool: &str) -> Self {
        Self {
            tool: tool.to_string(),
            params: HashMap::new(),
            condition: None,
            continue_on_error: false,
            result_name: None,
        }
    }

    pub fn param(mut self, key: &str, value: Value) -> Self {
        self.params.insert(key.to_string(), value);
        self
    }

    pub fn condition(mut self, condition: &str) -> Self {
        self.condition = Some(condition.to_string());
        self
    }

    pub fn continue_on_error(mut self) -> Self {
        self.continue_on_error = true;
        self
    }

    pub fn result_name(mut self, name: &str) -> Self {
        self.result_name = Some(name.to_string());
        self
    }

    fn to_json(&self) -> Value {
        let mut step = json!({ "tool": self.tool, "params": self.params });
        if let Some(ref condition) = self.condition {
            step["condition"] = json!(condition);
        }
        if self.continue_on_error {
            step["continueOnError"] = json!(true);
        }
        if let Some(ref name) = self.result_name {
            step["resultName"] = json!(name);
        }
        step
    }
}

pub struct TestTask {
    pub id: String,
    pub priority: Option<String>,
    pub continue_on_error: bool,
    pub steps: Vec<TestStep>,
}

impl TestTask {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            priority: None,
            continue_on_error: false,
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, step: TestStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn priority(mut self, priority: &str) -> Self {
        self.priority = Some(priority.to_string());
        self
    }

    pub fn continue_on_error(mut self) -> Self {
        self.continue_on_error = true;
        self
    }

    fn to_json(&self) -> Value {
        let mut task = json!({
            "id": self.id,
            "steps": self.steps.iter().map(TestStep::to_json).collect::<Vec<_>>(),
        });
        if let Some(ref priority) = self.priority {
            task["priority"] = json!(priority);
        }
        if self.continue_on_error {
            task["continueOnError"] = json!(true);
        }
        task
    }
}

pub struct TestWorkflowBuilder {
    name: String,
    parallel: bool,
    variables: HashMap<String, Value>,
    workflow: Vec<TestTask>,
    tasks: Vec<TestTask>,
}

impl TestWorkflowBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parallel: false,
            variables: HashMap::new(),
            workflow: Vec::new(),
            tasks: Vec::new(),
        }
    }

    pub fn parallel(mut self) -> Self {
        self.parallel = true;
        self
    }

    pub fn with_variable(mut self, key: &str, value: Value) -> Self {
        self.variables.insert(key.to_string(), value);
        self
    }

    pub fn workflow_task(mut self, task: TestTask) -> Self {
        self.workflow.push(task);
        self
    }

    pub fn queued_task(mut self, task: TestTask) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn generate_yaml(&self) -> String {
        let mut document = json!({
            "name": self.name,
            "parallel": self.parallel,
            "variables": self.variables,
        });
        if !self.workflow.is_empty() {
            document["workflow"] = json!(self.workflow.iter().map(TestTask::to_json).collect::<Vec<_>>());
        }
        if !self.tasks.is_empty() {
            document["tasks"] = json!(self.tasks.iter().map(TestTask::to_json).collect::<Vec<_>>());
        }
        serde_yaml::to_string(&document).unwrap()
    }

    pub async fn write_to_file(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        fs::write(path, self.generate_yaml()).await?;
        Ok(())
    }
}

pub struct TestEnvironment {
    pub temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn workflow_file(&self, name: &str) -> PathBuf {
        self.path().join(format!("{}.yaml", name))
    }

    pub fn output_file(&self, name: &str) -> PathBuf {
        self.path().join(format!("{}_output.json", name))
    }

    pub async fn create_workflow_file(&self, name: &str, builder: &TestWorkflowBuilder) -> PathBuf {
        let workflow_file = self.workflow_file(name);
        builder
            .write_to_file(&workflow_file)
            .await
            .expect("Failed to write workflow file");
        workflow_file
    }
}

pub async fn read_json_output(
    file_path: &Path,
) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(file_path).await?;
    let json: serde_json::Value = serde_json::from_str(&content)?;
    Ok(json)
}
