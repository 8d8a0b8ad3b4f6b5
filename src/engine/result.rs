// ABOUTME: Result types for step, task, and workflow execution
// ABOUTME: Failures are recorded here instead of being raised to the caller

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::context::ExecutionContext;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub tool_id: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
}

impl StepResult {
    pub fn success(tool_id: impl Into<String>, value: Value, started_at: DateTime<Utc>) -> Self {
        Self::finish(tool_id.into(), StepStatus::Success, Some(value), None, started_at)
    }

    pub fn skipped(tool_id: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self::finish(tool_id.into(), StepStatus::Skipped, None, None, started_at)
    }

    pub fn failed(
        tool_id: impl Into<String>,
        error: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self::finish(
            tool_id.into(),
            StepStatus::Failed,
            None,
            Some(error.into()),
            started_at,
        )
    }

    fn finish(
        tool_id: String,
        status: StepStatus,
        value: Option<Value>,
        error: Option<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            tool_id,
            status,
            value,
            error,
            started_at,
            duration: elapsed_since(started_at),
        }
    }

    pub fn is_successful(&self) -> bool {
        self.status == StepStatus::Success
    }

    pub fn is_failed(&self) -> bool {
        self.status == StepStatus::Failed
    }
}

/// Outcome of running one task's steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub task_id: String,
    pub success: bool,
    pub step_results: Vec<StepResult>,
    /// Working context after the last executed step.
    pub context: ExecutionContext,
    /// Context writes in the order they were made.
    #[serde(skip)]
    pub updates: Vec<(String, Value)>,
}

impl TaskOutcome {
    pub fn first_error(&self) -> Option<&str> {
        self.step_results
            .iter()
            .find(|result| result.is_failed())
            .and_then(|result| result.error.as_deref())
    }

    pub fn count(&self, status: StepStatus) -> usize {
        self.step_results
            .iter()
            .filter(|result| result.status == status)
            .count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowOutcome {
    pub workflow_id: String,
    pub success: bool,
    /// One entry per launched task, in document order.
    pub task_results: Vec<TaskOutcome>,
    pub context: ExecutionContext,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
}

impl WorkflowOutcome {
    pub fn get_task_result(&self, task_id: &str) -> Option<&TaskOutcome> {
        self.task_results.iter().find(|t| t.task_id == task_id)
    }

    pub fn failed_tasks(&self) -> impl Iterator<Item = &TaskOutcome> {
        self.task_results.iter().filter(|t| !t.success)
    }
}

pub(crate) fn elapsed_since(started_at: DateTime<Utc>) -> Duration {
    (Utc::now() - started_at).to_std().unwrap_or(Duration::ZERO)
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepStatus::Success => write!(f, "success"),
            StepStatus::Skipped => write!(f, "skipped"),
            StepStatus::Failed => write!(f, "failed"),
        }
    }
}
