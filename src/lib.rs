// ABOUTME: Main library module for the toolflow workflow engine
// ABOUTME: Exports all core modules and provides the public API

pub mod cli;
pub mod engine;
pub mod output;
pub mod parser;
pub mod tools;

// Re-export commonly used types
pub use cli::{App, Args, Config};
pub use engine::{
    evaluate_condition, ExecutionContext, Priority, QueueRunner, Step, StepExecutor, StepResult,
    StepStatus, Task, TaskExecutor, TaskOutcome, TaskScheduler, Workflow, WorkflowOrchestrator,
    WorkflowOutcome,
};
pub use output::{OutputHandler, RunSummary};
pub use parser::{WorkflowDocument, WorkflowParser, WorkflowValidator};
pub use tools::{Tool, ToolInvoker, ToolRegistry};

// Error handling
pub type Result<T> = anyhow::Result<T>;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
