// ABOUTME: Task and step definitions as they appear in workflow documents
// ABOUTME: Compiles definitions into engine tasks with parsed guards and parameter templates

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ValidationError;
use crate::engine::{Condition, ParamValue, Priority, Step, Task};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinition {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(default, alias = "continue_on_error")]
    pub continue_on_error: bool,
    /// Tier used when the task is enqueued from the `tasks` section.
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDefinition {
    #[serde(default)]
    pub tool: String,
    #[serde(default)]
    pub params: IndexMap<String, Value>,
    pub condition: Option<String>,
    #[serde(default, alias = "continue_on_error")]
    pub continue_on_error: bool,
    #[serde(alias = "result_name")]
    pub result_name: Option<String>,
}

impl TaskDefinition {
    /// Effective id: explicit `id`, then `name`, then `task-<n>` (1-based).
    pub fn resolved_id(&self, index: usize) -> String {
        self.id
            .as_deref()
            .or(self.name.as_deref())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("task-{}", index + 1))
    }

    pub fn compile(&self, index: usize) -> Result<Task, ValidationError> {
        let id = self.resolved_id(index);

        if self.steps.is_empty() {
            return Err(ValidationError::EmptyTask { task: id });
        }

        let mut task = Task::new(id.clone()).continue_on_error(self.continue_on_error);
        if let Some(ref name) = self.name {
            task = task.with_name(name.clone());
        }

        for (position, step) in self.steps.iter().enumerate() {
            if step.tool.trim().is_empty() {
                return Err(ValidationError::MissingTool {
                    task: id,
                    step: position + 1,
                });
            }
            task = task.with_step(step.compile());
        }

        Ok(task)
    }
}

impl StepDefinition {
    pub fn compile(&self) -> Step {
        Step {
            tool_id: self.tool.trim().to_string(),
            params: self
                .params
                .iter()
                .map(|(key, value)| (key.clone(), ParamValue::compile(value.clone())))
                .collect(),
            guard: self.condition.as_deref().map(Condition::parse),
            continue_on_error: self.continue_on_error,
            result_name: self.result_name.clone(),
        }
    }
}
