// ABOUTME: Execution engine for toolflow workflows
// ABOUTME: Step/task/workflow executors, guard conditions, and the retrying priority queue

pub mod condition;
pub mod context;
pub mod error;
pub mod executor;
pub mod expr;
pub mod model;
pub mod result;
pub mod runner;
pub mod scheduler;
pub mod step;
pub mod workflow;

pub use condition::{evaluate_condition, Comparison, Condition, ConditionMode, Literal, Operator};
pub use context::ExecutionContext;
pub use error::{ExecutionError, Result, SchedulerError};
pub use executor::{EngineConfig, TaskExecutor};
pub use expr::{resolve_params, ParamValue, TemplateSegment};
pub use model::{Step, Task, Workflow};
pub use result::{StepResult, StepStatus, TaskOutcome, WorkflowOutcome};
pub use runner::{QueueReport, QueueRunner};
pub use scheduler::{
    Priority, QueueStats, SchedulerConfig, TaskId, TaskRecord, TaskScheduler, TaskState,
};
pub use step::StepExecutor;
pub use workflow::WorkflowOrchestrator;
