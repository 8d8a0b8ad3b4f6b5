// ABOUTME: Workflow document structure and loading from YAML or JSON
// ABOUTME: Validates document shape and compiles both task sections into engine types

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use tokio::fs;
use tracing::debug;

use super::error::{ParserError, Result, ValidationError};
use super::task::TaskDefinition;
use crate::engine::{ExecutionContext, Priority, Task, Workflow};

/// Serialized shape of a workflow document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    /// Run the `workflow` section's tasks concurrently.
    #[serde(default)]
    pub parallel: bool,
    #[serde(default)]
    pub variables: IndexMap<String, Value>,
    /// Tasks to enqueue on the scheduler.
    pub tasks: Option<Vec<TaskDefinition>>,
    /// Tasks run directly by the workflow orchestrator.
    pub workflow: Option<Vec<TaskDefinition>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueuedTask {
    pub task: Task,
    pub priority: Priority,
}

/// A loaded and compiled workflow document.
#[derive(Debug, Clone)]
pub struct WorkflowDocument {
    pub name: String,
    pub description: Option<String>,
    pub variables: ExecutionContext,
    pub workflow: Option<Workflow>,
    pub tasks: Vec<QueuedTask>,
    pub definition: WorkflowDefinition,
}

impl WorkflowDocument {
    /// Load a document from disk; `.json` files are parsed as JSON, anything else as YAML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(ParserError::IoError)?;
        Self::from_str_with_path(&content, path)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let definition: WorkflowDefinition =
            serde_yaml::from_str(content).map_err(ParserError::YamlError)?;
        Self::from_definition(definition)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let definition: WorkflowDefinition =
            serde_json::from_str(content).map_err(ParserError::JsonError)?;
        Self::from_definition(definition)
    }

    fn from_str_with_path(content: &str, path: &Path) -> Result<Self> {
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json(content)
        } else {
            Self::from_yaml(content)
        }
    }

    pub fn from_definition(definition: WorkflowDefinition) -> Result<Self> {
        validate_structure(&definition)?;

        let workflow = match definition.workflow {
            Some(ref tasks) => Some(
                Workflow::new(definition.name.trim(), compile_section(tasks, "workflow")?)
                    .parallel(definition.parallel),
            ),
            None => None,
        };

        let tasks = match definition.tasks {
            Some(ref tasks) => compile_section(tasks, "tasks")?
                .into_iter()
                .zip(tasks.iter())
                .map(|(task, definition)| QueuedTask {
                    task,
                    priority: definition.priority,
                })
                .collect(),
            None => Vec::new(),
        };

        let variables = definition
            .variables
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        debug!(
            "Loaded workflow document '{}' ({} workflow tasks, {} queued tasks)",
            definition.name,
            workflow.as_ref().map_or(0, |w| w.tasks.len()),
            tasks.len()
        );

        Ok(Self {
            name: definition.name.trim().to_string(),
            description: definition.description.clone(),
            variables,
            workflow,
            tasks,
            definition,
        })
    }

    /// Initial context: document variables overlaid with `overrides`.
    pub fn initial_context<I>(&self, overrides: I) -> ExecutionContext
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut context = self.variables.clone();
        context.apply(overrides);
        context
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len() + self.workflow.as_ref().map_or(0, |w| w.tasks.len())
    }

    /// Every compiled task in both sections, workflow first.
    pub fn all_tasks(&self) -> impl Iterator<Item = &Task> {
        self.workflow
            .iter()
            .flat_map(|workflow| workflow.tasks.iter())
            .chain(self.tasks.iter().map(|queued| &queued.task))
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(&self.definition).map_err(ParserError::YamlError)
    }
}

fn validate_structure(definition: &WorkflowDefinition) -> Result<()> {
    if definition.name.trim().is_empty() {
        return Err(ParserError::MissingField("name".to_string()));
    }

    if definition.tasks.is_none() && definition.workflow.is_none() {
        return Err(ValidationError::EmptyWorkflow.into());
    }

    Ok(())
}

fn compile_section(definitions: &[TaskDefinition], section: &str) -> Result<Vec<Task>> {
    let mut seen = HashSet::new();
    let mut tasks = Vec::with_capacity(definitions.len());

    for (index, definition) in definitions.iter().enumerate() {
        let task = definition.compile(index)?;
        if !seen.insert(task.id.clone()) {
            return Err(ValidationError::DuplicateTask {
                task: task.id,
                section: section.to_string(),
            }
            .into());
        }
        tasks.push(task);
    }

    Ok(tasks)
}

#[derive(Debug, Clone)]
pub struct WorkflowParser;

impl WorkflowParser {
    pub fn new() -> Self {
        Self
    }

    pub async fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<WorkflowDocument> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(ParserError::IoError)?;
        WorkflowDocument::from_str_with_path(&content, path)
    }

    pub fn parse_string(&self, content: &str) -> Result<WorkflowDocument> {
        WorkflowDocument::from_yaml(content)
    }
}

impl Default for WorkflowParser {
    fn default() -> Self {
        Self::new()
    }
}
