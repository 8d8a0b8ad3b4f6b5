// ABOUTME: Output handler module for run summary formatting and persistence
// ABOUTME: Renders workflow and queue results as text, JSON, or YAML to stdout or a file

pub mod error;
pub mod formatter;
pub mod writer;

use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

use self::error::Result;
use self::writer::{FileWriter, OutputWriter, StdoutWriter};
use crate::engine::{QueueReport, TaskRecord, WorkflowOutcome};

pub use self::error::OutputError;
pub use self::formatter::{formatter_for, OutputFormat, OutputFormatter};

/// Queue drain results plus the final state of every record.
#[derive(Debug, Clone, Serialize)]
pub struct QueueSummary {
    pub report: QueueReport,
    pub records: Vec<TaskRecord>,
}

/// Everything one CLI invocation produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub name: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow: Option<WorkflowOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue: Option<QueueSummary>,
}

impl RunSummary {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            name: name.into(),
            success: true,
            workflow: None,
            queue: None,
        }
    }

    pub fn with_workflow(mut self, outcome: WorkflowOutcome) -> Self {
        self.success &= outcome.success;
        self.workflow = Some(outcome);
        self
    }

    pub fn with_queue(mut self, queue: QueueSummary) -> Self {
        self.success &= queue.report.is_success();
        self.queue = Some(queue);
        self
    }
}

pub struct OutputHandler {
    format: OutputFormat,
    destination: Option<PathBuf>,
}

impl OutputHandler {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            destination: None,
        }
    }

    pub fn with_destination(mut self, destination: Option<PathBuf>) -> Self {
        self.destination = destination;
        self
    }

    /// Format `summary` and write it to the configured destination (stdout by default).
    pub async fn emit(&self, summary: &RunSummary) -> Result<()> {
        let content = formatter_for(self.format).format_run(summary)?;

        let writer: Box<dyn OutputWriter> = match self.destination {
            Some(ref path) => Box::new(FileWriter::new(path.clone())),
            None => Box::new(StdoutWriter::new()),
        };

        writer.write(&content).await
    }
}

impl Default for OutputHandler {
    fn default() -> Self {
        Self::new(OutputFormat::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ExecutionContext, QueueStats};
    use chrono::Utc;
    use std::time::Duration;
    use tempfile::tempdir;

    fn report(failed: usize) -> QueueReport {
        QueueReport {
            executions: 1,
            completed: 1 - failed,
            failed,
            retried: 0,
            stats: QueueStats::default(),
            duration: Duration::ZERO,
        }
    }

    #[test]
    fn test_summary_success_tracks_parts() {
        let ok = RunSummary::new("a").with_queue(QueueSummary {
            report: report(0),
            records: Vec::new(),
        });
        assert!(ok.success);

        let failed = RunSummary::new("b")
            .with_workflow(WorkflowOutcome {
                workflow_id: "b".to_string(),
                success: false,
                task_results: Vec::new(),
                context: ExecutionContext::new(),
                started_at: Utc::now(),
                duration: Duration::ZERO,
            })
            .with_queue(QueueSummary {
                report: report(0),
                records: Vec::new(),
            });
        assert!(!failed.success);
    }

    #[tokio::test]
    async fn test_emit_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.json");

        OutputHandler::new(OutputFormat::Json)
            .with_destination(Some(path.clone()))
            .emit(&RunSummary::new("file"))
            .await
            .unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["name"], serde_json::json!("file"));
    }
}
