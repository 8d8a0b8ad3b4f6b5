// ABOUTME: Output formatters for run summaries (JSON, YAML, text)
// ABOUTME: Handles serialization and human-readable presentation of workflow and queue results

use std::fmt;
use std::str::FromStr;

use super::error::{OutputError, Result};
use super::{QueueSummary, RunSummary};
use crate::engine::context::render_value;
use crate::engine::{StepResult, StepStatus, TaskOutcome, TaskState, WorkflowOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

impl FromStr for OutputFormat {
    type Err = OutputError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            other => Err(OutputError::UnknownFormat {
                format: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Yaml => write!(f, "yaml"),
        }
    }
}

pub trait OutputFormatter: Send + Sync {
    fn format_run(&self, summary: &RunSummary) -> Result<String>;
}

pub struct JsonFormatter {
    pretty: bool,
}

pub struct YamlFormatter;

pub struct TextFormatter {
    /// Longest value rendered inline before truncation.
    max_value_length: usize,
}

/// Formatter for `format`.
pub fn formatter_for(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter::new()),
        OutputFormat::Json => Box::new(JsonFormatter::new_pretty()),
        OutputFormat::Yaml => Box::new(YamlFormatter::new()),
    }
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self { pretty: false }
    }

    pub fn new_pretty() -> Self {
        Self { pretty: true }
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_run(&self, summary: &RunSummary) -> Result<String> {
        if self.pretty {
            serde_json::to_string_pretty(summary).map_err(OutputError::SerializationError)
        } else {
            serde_json::to_string(summary).map_err(OutputError::SerializationError)
        }
    }
}

impl YamlFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for YamlFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for YamlFormatter {
    fn format_run(&self, summary: &RunSummary) -> Result<String> {
        serde_yaml::to_string(summary).map_err(OutputError::YamlSerializationError)
    }
}

impl TextFormatter {
    pub fn new() -> Self {
        Self {
            max_value_length: 200,
        }
    }

    pub fn with_max_value_length(mut self, max_value_length: usize) -> Self {
        self.max_value_length = max_value_length;
        self
    }

    fn format_workflow(&self, outcome: &WorkflowOutcome, output: &mut String) {
        output.push_str(&format!(
            "\nWorkflow: {} [{}]\n",
            outcome.workflow_id,
            if outcome.success { "success" } else { "failed" }
        ));
        output.push_str(&format!(
            "Started: {}\n",
            outcome.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        output.push_str(&format!("Duration: {:.2}s\n", outcome.duration.as_secs_f64()));

        if outcome.task_results.is_empty() {
            output.push_str("  (no tasks)\n");
            return;
        }

        for task in &outcome.task_results {
            for line in self.format_task(task).lines() {
                output.push_str(&format!("  {}\n", line));
            }
        }
    }

    fn format_task(&self, task: &TaskOutcome) -> String {
        let mut output = format!(
            "{} {} ({} ok, {} skipped, {} failed)",
            if task.success { "✓" } else { "✗" },
            task.task_id,
            task.count(StepStatus::Success),
            task.count(StepStatus::Skipped),
            task.count(StepStatus::Failed),
        );

        for step in &task.step_results {
            output.push('\n');
            output.push_str(&self.format_step(step));
        }

        output
    }

    fn format_step(&self, step: &StepResult) -> String {
        let icon = match step.status {
            StepStatus::Success => "✓",
            StepStatus::Skipped => "⊘",
            StepStatus::Failed => "✗",
        };

        let mut output = format!(
            "    {} {} [{:.2}s]",
            icon,
            step.tool_id,
            step.duration.as_secs_f64()
        );

        if let Some(ref value) = step.value {
            let rendered = self.truncate(render_value(value));
            if !rendered.is_empty() {
                output.push_str(&format!("\n        Value: {}", rendered.replace('\n', "\n        ")));
            }
        }

        if let Some(ref error) = step.error {
            output.push_str(&format!("\n        Error: {}", error));
        }

        output
    }

    fn format_queue(&self, queue: &QueueSummary, output: &mut String) {
        let report = &queue.report;
        output.push_str("\nQueue:\n");
        output.push_str(&format!("  Executions: {}\n", report.executions));
        output.push_str(&format!("  Completed: {}\n", report.completed));
        output.push_str(&format!("  Failed: {}\n", report.failed));
        output.push_str(&format!("  Retries: {}\n", report.retried));
        output.push_str(&format!("  Duration: {:.2}s\n", report.duration.as_secs_f64()));

        if !queue.records.is_empty() {
            output.push_str("\nRecords:\n");
            for record in &queue.records {
                let icon = match record.state {
                    TaskState::Completed => "✓",
                    TaskState::Failed => "✗",
                    TaskState::Running => "⟳",
                    TaskState::Pending | TaskState::Queued => "⧖",
                };
                output.push_str(&format!(
                    "  {} {} ({}, {} priority, {} failed attempts) {}\n",
                    icon, record.task.id, record.state, record.priority, record.attempts, record.id
                ));
                if let Some(ref error) = record.last_error {
                    output.push_str(&format!("      Last error: {}\n", error));
                }
            }
        }

        let stats = &report.stats;
        output.push_str(&format!(
            "\nStats: total={} pending={} queued={} running={} completed={} failed={}\n",
            stats.total, stats.pending, stats.queued, stats.running, stats.completed, stats.failed
        ));
    }

    fn truncate(&self, text: String) -> String {
        if text.chars().count() > self.max_value_length {
            let truncated: String = text.chars().take(self.max_value_length).collect();
            format!("{}... [truncated]", truncated)
        } else {
            text
        }
    }
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for TextFormatter {
    fn format_run(&self, summary: &RunSummary) -> Result<String> {
        let mut output = String::new();

        output.push_str(&format!("Run: {} ({})\n", summary.name, summary.run_id));
        output.push_str(&format!(
            "Status: {}\n",
            if summary.success { "success" } else { "failed" }
        ));

        if let Some(ref workflow) = summary.workflow {
            self.format_workflow(workflow, &mut output);
        }

        if let Some(ref queue) = summary.queue {
            self.format_queue(queue, &mut output);
        }

        Ok(output)
    }
}
