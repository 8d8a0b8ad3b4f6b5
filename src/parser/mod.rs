// ABOUTME: Parser module for YAML and JSON workflow documents
// ABOUTME: Exports document loading, validation warnings, and definition types

pub mod error;
pub mod task;
pub mod validation;
pub mod workflow;

pub use error::{ParserError, Result, ValidationError};
pub use task::{StepDefinition, TaskDefinition};
pub use validation::{ValidationReport, ValidationWarning, WorkflowValidator};
pub use workflow::{QueuedTask, WorkflowDefinition, WorkflowDocument, WorkflowParser};
