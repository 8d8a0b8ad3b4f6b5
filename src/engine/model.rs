// ABOUTME: Engine-side data model for steps, tasks, and workflows
// ABOUTME: Parameters and guards arrive here already compiled by the document loader

use indexmap::IndexMap;
use serde_json::Value;

use super::condition::Condition;
use super::expr::ParamValue;

/// One tool invocation plus its guard and failure policy.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub tool_id: String,
    pub params: IndexMap<String, ParamValue>,
    pub guard: Option<Condition>,
    pub continue_on_error: bool,
    /// Extra context key the step's value is stored under, besides `tool_id`.
    pub result_name: Option<String>,
}

impl Step {
    pub fn new(tool_id: impl Into<String>) -> Self {
        Self {
            tool_id: tool_id.into(),
            params: IndexMap::new(),
            guard: None,
            continue_on_error: false,
            result_name: None,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), ParamValue::compile(value));
        self
    }

    pub fn with_condition(mut self, expression: &str) -> Self {
        self.guard = Some(Condition::parse(expression));
        self
    }

    pub fn with_result_name(mut self, name: impl Into<String>) -> Self {
        self.result_name = Some(name.into());
        self
    }

    pub fn continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub steps: Vec<Step>,
    /// Whether a failure of this task is tolerated by the enclosing workflow.
    pub continue_on_error: bool,
}

impl Task {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            steps: Vec::new(),
            continue_on_error: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Workflow {
    pub id: String,
    pub tasks: Vec<Task>,
    pub parallel: bool,
}

impl Workflow {
    pub fn new(id: impl Into<String>, tasks: Vec<Task>) -> Self {
        Self {
            id: id.into(),
            tasks,
            parallel: false,
        }
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}
