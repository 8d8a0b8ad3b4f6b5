// ABOUTME: Error types for the execution engine and the task scheduler
// ABOUTME: Only contract violations surface here; task-level failures live in result types

use thiserror::Error;

use super::scheduler::{TaskId, TaskState};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulerError {
    #[error("Task not found: {task_id}")]
    UnknownTask { task_id: TaskId },

    #[error("Invalid transition for task {task_id}: cannot {operation} a {state} task")]
    InvalidTransition {
        task_id: TaskId,
        operation: &'static str,
        state: TaskState,
    },
}

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

pub type Result<T> = std::result::Result<T, ExecutionError>;
