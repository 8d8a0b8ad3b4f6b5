// ABOUTME: Error types for workflow document loading and validation
// ABOUTME: Defines specific error types for parser module operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Failed to read workflow file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Empty workflow: neither 'tasks' nor 'workflow' is defined")]
    EmptyWorkflow,

    #[error("Task '{task}' has no steps")]
    EmptyTask { task: String },

    #[error("Step {step} of task '{task}' has no tool")]
    MissingTool { task: String, step: usize },

    #[error("Duplicate task id '{task}' in '{section}'")]
    DuplicateTask { task: String, section: String },
}

pub type Result<T> = std::result::Result<T, ParserError>;
