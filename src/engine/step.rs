// ABOUTME: Step executor evaluating guards, resolving parameters, and invoking tools
// ABOUTME: Tool failures and panics are captured into a StepResult, never propagated

use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::condition::ConditionMode;
use super::context::ExecutionContext;
use super::expr::resolve_params;
use super::model::Step;
use super::result::StepResult;
use crate::tools::ToolInvoker;

#[derive(Clone)]
pub struct StepExecutor {
    tools: Arc<dyn ToolInvoker>,
    condition_mode: ConditionMode,
}

impl StepExecutor {
    pub fn new(tools: Arc<dyn ToolInvoker>) -> Self {
        Self {
            tools,
            condition_mode: ConditionMode::default(),
        }
    }

    pub fn with_condition_mode(mut self, mode: ConditionMode) -> Self {
        self.condition_mode = mode;
        self
    }

    pub fn condition_mode(&self) -> ConditionMode {
        self.condition_mode
    }

    pub fn tools(&self) -> &Arc<dyn ToolInvoker> {
        &self.tools
    }

    /// Run one step against `context` without modifying it.
    pub async fn execute_step(&self, step: &Step, context: &ExecutionContext) -> StepResult {
        let started_at = Utc::now();

        if let Some(ref guard) = step.guard {
            if guard.is_malformed() {
                warn!(
                    "Malformed condition on {} ({:?} mode): {}",
                    step.tool_id, self.condition_mode, guard
                );
            }
            if !guard.evaluate(context, self.condition_mode) {
                info!("Condition not met for {}, skipping: {}", step.tool_id, guard);
                return StepResult::skipped(&step.tool_id, started_at);
            }
        }

        let params = resolve_params(&step.params, context);
        debug!("Invoking {} with {} params", step.tool_id, params.len());

        let invocation = self.tools.invoke(&step.tool_id, params);
        match AssertUnwindSafe(invocation).catch_unwind().await {
            Ok(Ok(value)) => {
                debug!("Step {} succeeded", step.tool_id);
                StepResult::success(&step.tool_id, value, started_at)
            }
            Ok(Err(e)) => {
                warn!("Step {} failed: {}", step.tool_id, e);
                StepResult::failed(&step.tool_id, e.to_string(), started_at)
            }
            Err(panic) => {
                let message = format!("Tool panicked: {}", panic_message(panic.as_ref()));
                warn!("Step {} failed: {}", step.tool_id, message);
                StepResult::failed(&step.tool_id, message, started_at)
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
