// ABOUTME: Non-fatal workflow checks reported by `validate`
// ABOUTME: Flags malformed guards, unknown tools, and placeholders nothing will ever produce

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use super::workflow::WorkflowDocument;
use crate::engine::{Condition, ConditionMode, Task};
use crate::tools::ToolInvoker;

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationWarning {
    MalformedCondition {
        task: String,
        step: usize,
        expression: String,
        reason: String,
        mode: ConditionMode,
    },
    UnknownTool {
        task: String,
        step: usize,
        tool: String,
    },
    UnresolvedReference {
        task: String,
        step: usize,
        name: String,
    },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationWarning::MalformedCondition {
                task,
                step,
                expression,
                reason,
                mode,
            } => {
                let outcome = match mode {
                    ConditionMode::FailOpen => "always run",
                    ConditionMode::Strict => "never run",
                };
                write!(
                    f,
                    "Task '{}' step {}: condition '{}' is malformed ({}); the step will {}",
                    task, step, expression, reason, outcome
                )
            }
            ValidationWarning::UnknownTool { task, step, tool } => {
                write!(f, "Task '{}' step {}: unknown tool '{}'", task, step, tool)
            }
            ValidationWarning::UnresolvedReference { task, step, name } => write!(
                f,
                "Task '{}' step {}: '{{{{{}}}}}' is not set by variables or any earlier step",
                task, step, name
            ),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub warnings: Vec<ValidationWarning>,
    pub task_count: usize,
    pub step_count: usize,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

pub struct WorkflowValidator {
    condition_mode: ConditionMode,
    tools: Option<Arc<dyn ToolInvoker>>,
}

impl WorkflowValidator {
    pub fn new() -> Self {
        Self {
            condition_mode: ConditionMode::default(),
            tools: None,
        }
    }

    pub fn with_condition_mode(mut self, mode: ConditionMode) -> Self {
        self.condition_mode = mode;
        self
    }

    pub fn with_tools(mut self, tools: Arc<dyn ToolInvoker>) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Collect warnings for a loaded document. Structural errors were already
    /// rejected while loading.
    pub fn validate(&self, document: &WorkflowDocument) -> ValidationReport {
        let mut report = ValidationReport::new();

        if let Some(ref workflow) = document.workflow {
            // Sequential tasks see names produced by earlier tasks; parallel ones only
            // see the initial variables.
            let mut known: HashSet<String> = document.variables.iter().map(|(k, _)| k.clone()).collect();
            for task in &workflow.tasks {
                if workflow.parallel {
                    let mut scoped = known.clone();
                    self.check_task(task, &mut scoped, &mut report);
                } else {
                    self.check_task(task, &mut known, &mut report);
                }
            }
        }

        for queued in &document.tasks {
            let mut known: HashSet<String> = document.variables.iter().map(|(k, _)| k.clone()).collect();
            self.check_task(&queued.task, &mut known, &mut report);
        }

        report
    }

    fn check_task(&self, task: &Task, known: &mut HashSet<String>, report: &mut ValidationReport) {
        report.task_count += 1;

        for (index, step) in task.steps.iter().enumerate() {
            let position = index + 1;
            report.step_count += 1;

            if let Some(Condition::Malformed { expression, reason }) = &step.guard {
                report.warnings.push(ValidationWarning::MalformedCondition {
                    task: task.id.clone(),
                    step: position,
                    expression: expression.clone(),
                    reason: reason.clone(),
                    mode: self.condition_mode,
                });
            }

            if let Some(ref tools) = self.tools {
                if !tools.has_tool(&step.tool_id) {
                    report.warnings.push(ValidationWarning::UnknownTool {
                        task: task.id.clone(),
                        step: position,
                        tool: step.tool_id.clone(),
                    });
                }
            }

            for param in step.params.values() {
                for name in param.references() {
                    if !known.contains(name) {
                        report.warnings.push(ValidationWarning::UnresolvedReference {
                            task: task.id.clone(),
                            step: position,
                            name: name.to_string(),
                        });
                    }
                }
            }

            if let Some(ref result_name) = step.result_name {
                known.insert(result_name.clone());
            }
            known.insert(step.tool_id.clone());
        }
    }
}

impl Default for WorkflowValidator {
    fn default() -> Self {
        Self::new()
    }
}
