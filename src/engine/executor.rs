// ABOUTME: Task executor running a task's steps in order against a working context copy
// ABOUTME: Applies the stop/continue failure policy and records context writes

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::condition::ConditionMode;
use super::context::ExecutionContext;
use super::error::{ExecutionError, Result};
use super::model::Task;
use super::result::{StepStatus, TaskOutcome};
use super::step::StepExecutor;
use crate::tools::ToolInvoker;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Malformed guards skip their step instead of running it.
    #[serde(default)]
    pub strict_conditions: bool,

    /// Upper bound on concurrently running tasks in a parallel workflow.
    /// `None` dispatches every task at once.
    #[serde(default)]
    pub max_parallel_tasks: Option<usize>,
}

impl EngineConfig {
    pub fn condition_mode(&self) -> ConditionMode {
        if self.strict_conditions {
            ConditionMode::Strict
        } else {
            ConditionMode::FailOpen
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_parallel_tasks == Some(0) {
            return Err(ExecutionError::ConfigurationError(
                "max_parallel_tasks must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct TaskExecutor {
    step_executor: StepExecutor,
}

impl TaskExecutor {
    pub fn new(tools: Arc<dyn ToolInvoker>) -> Self {
        Self {
            step_executor: StepExecutor::new(tools),
        }
    }

    pub fn with_config(tools: Arc<dyn ToolInvoker>, config: &EngineConfig) -> Self {
        Self {
            step_executor: StepExecutor::new(tools).with_condition_mode(config.condition_mode()),
        }
    }

    pub fn step_executor(&self) -> &StepExecutor {
        &self.step_executor
    }

    /// Run every step of `task` in order. The caller's context is left untouched;
    /// the updated copy is returned in the outcome.
    #[instrument(skip(self, task, context), fields(task_id = %task.id))]
    pub async fn execute_task(&self, task: &Task, context: &ExecutionContext) -> TaskOutcome {
        let mut working = context.clone();
        let mut step_results = Vec::with_capacity(task.steps.len());
        let mut updates = Vec::new();

        info!("Executing task: {} ({} steps)", task.name, task.steps.len());

        for (index, step) in task.steps.iter().enumerate() {
            let result = self.step_executor.execute_step(step, &working).await;

            match result.status {
                StepStatus::Success => {
                    if let Some(ref value) = result.value {
                        if let Some(ref result_name) = step.result_name {
                            working.set(result_name.clone(), value.clone());
                            updates.push((result_name.clone(), value.clone()));
                        }
                        working.set(step.tool_id.clone(), value.clone());
                        updates.push((step.tool_id.clone(), value.clone()));
                    }
                    step_results.push(result);
                }
                StepStatus::Skipped => step_results.push(result),
                StepStatus::Failed if step.continue_on_error => {
                    warn!(
                        "Step {} ({}) failed, continuing: {:?}",
                        index, step.tool_id, result.error
                    );
                    step_results.push(result);
                }
                StepStatus::Failed => {
                    warn!(
                        "Step {} ({}) failed, aborting task {}: {:?}",
                        index, step.tool_id, task.id, result.error
                    );
                    step_results.push(result);
                    break;
                }
            }
        }

        let success = step_results
            .iter()
            .all(|result| result.status != StepStatus::Failed);

        info!(
            "Task {} finished: success={} ({}/{} steps recorded)",
            task.id,
            success,
            step_results.len(),
            task.steps.len()
        );

        TaskOutcome {
            task_id: task.id.clone(),
            success,
            step_results,
            context: working,
            updates,
        }
    }
}
