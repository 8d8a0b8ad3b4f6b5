// ABOUTME: Command implementations for the toolflow CLI
// ABOUTME: Handles execution of run, queue, validate, and tools commands

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use super::args::Args;
use super::config::Config;
use crate::engine::{
    EngineConfig, ExecutionContext, Priority, QueueRunner, SchedulerConfig, Task, TaskExecutor,
    TaskScheduler, WorkflowOrchestrator,
};
use crate::output::{OutputFormat, OutputHandler, QueueSummary, RunSummary};
use crate::parser::{WorkflowDocument, WorkflowParser, WorkflowValidator};
use crate::tools::ToolRegistry;

/// Execute a workflow document: the `workflow` section through the orchestrator,
/// then the `tasks` section through the queue.
pub async fn run_workflow(
    workflow_path: PathBuf,
    vars: Vec<String>,
    parallel: bool,
    strict_conditions: bool,
    format: OutputFormat,
    output: Option<PathBuf>,
    config: &Config,
) -> Result<()> {
    info!("Starting workflow run: {}", workflow_path.display());

    let overrides = Args::parse_variables(&vars)?;
    info!("Parsed {} variable overrides", overrides.len());

    let document = load_document(&workflow_path).await?;

    let mut engine = config.engine.clone();
    engine.strict_conditions |= strict_conditions;

    let executor = build_executor(config, &engine);
    let mut context = initial_context(config, &document, overrides);
    let mut summary = RunSummary::new(document.name.clone());

    if let Some(ref workflow) = document.workflow {
        let workflow = workflow.clone().parallel(workflow.parallel || parallel);
        let orchestrator = WorkflowOrchestrator::with_config(executor.clone(), &engine);

        let outcome = orchestrator.execute_workflow(&workflow, &context).await;
        // Queued tasks see what the workflow produced.
        context = outcome.context.clone();
        summary = summary.with_workflow(outcome);
    }

    if !document.tasks.is_empty() {
        let tasks = document
            .tasks
            .iter()
            .map(|queued| (queued.task.clone(), queued.priority));
        let queue = drain_queue(tasks, config.scheduler.clone(), executor, &context).await?;
        summary = summary.with_queue(queue);
    }

    OutputHandler::new(format)
        .with_destination(output)
        .emit(&summary)
        .await
        .context("Failed to write run output")?;

    info!("Run completed: success={}", summary.success);

    if summary.success {
        Ok(())
    } else {
        Err(anyhow::anyhow!("Run of '{}' failed", summary.name))
    }
}

/// Enqueue a document's `tasks` section and drain it.
pub async fn queue_tasks(
    workflow_path: PathBuf,
    vars: Vec<String>,
    priority: Option<Priority>,
    max_retries: Option<u32>,
    format: OutputFormat,
    config: &Config,
) -> Result<()> {
    info!("Queueing tasks from: {}", workflow_path.display());

    let overrides = Args::parse_variables(&vars)?;
    let document = load_document(&workflow_path).await?;

    if document.tasks.is_empty() {
        return Err(anyhow::anyhow!(
            "'{}' has no tasks to enqueue",
            workflow_path.display()
        ));
    }

    let mut scheduler_config = config.scheduler.clone();
    if let Some(max_retries) = max_retries {
        scheduler_config.max_retries = max_retries;
    }

    let executor = build_executor(config, &config.engine);
    let context = initial_context(config, &document, overrides);
    let tasks = document
        .tasks
        .iter()
        .map(|queued| (queued.task.clone(), priority.unwrap_or(queued.priority)));

    let queue = drain_queue(tasks, scheduler_config, executor, &context).await?;
    let summary = RunSummary::new(document.name.clone()).with_queue(queue);

    OutputHandler::new(format)
        .emit(&summary)
        .await
        .context("Failed to write queue output")?;

    if summary.success {
        Ok(())
    } else {
        Err(anyhow::anyhow!("One or more queued tasks failed"))
    }
}

/// Validate a workflow file
pub async fn validate_workflow(workflow_path: PathBuf, config: &Config) -> Result<()> {
    info!("Validating workflow: {}", workflow_path.display());

    let document = load_document(&workflow_path).await?;

    let report = WorkflowValidator::new()
        .with_condition_mode(config.engine.condition_mode())
        .with_tools(Arc::new(ToolRegistry::with_builtins(config.tools.clone())))
        .validate(&document);

    println!("✓ Workflow '{}' is valid", document.name);
    if let Some(ref workflow) = document.workflow {
        println!(
            "  Workflow tasks: {} ({})",
            workflow.tasks.len(),
            if workflow.parallel { "parallel" } else { "sequential" }
        );
    }
    println!("  Queued tasks: {}", document.tasks.len());
    println!("  Steps: {}", report.step_count);
    println!("  Variables: {}", document.variables.len());

    if report.has_warnings() {
        println!("\nWarnings:");
        for warning in &report.warnings {
            println!("  ! {}", warning);
        }
    }

    info!(
        "Workflow validation completed with {} warnings",
        report.warnings.len()
    );

    Ok(())
}

/// Print the built-in tools
pub fn list_tools(config: &Config) -> Result<()> {
    let registry = ToolRegistry::with_builtins(config.tools.clone());

    println!("Available tools:");
    for (name, description) in registry.list() {
        println!("  {:<10} {}", name, description);
    }

    Ok(())
}

async fn load_document(path: &Path) -> Result<WorkflowDocument> {
    let document = WorkflowParser::new()
        .parse_file(path)
        .await
        .with_context(|| format!("Failed to load workflow {}", path.display()))?;
    info!("Loaded workflow: {}", document.name);
    Ok(document)
}

fn build_executor(config: &Config, engine: &EngineConfig) -> TaskExecutor {
    let tools = Arc::new(ToolRegistry::with_builtins(config.tools.clone()));
    TaskExecutor::with_config(tools, engine)
}

/// Config variables, overlaid by document variables, overlaid by `-V` overrides.
fn initial_context(
    config: &Config,
    document: &WorkflowDocument,
    overrides: Vec<(String, Value)>,
) -> ExecutionContext {
    let mut context: ExecutionContext = config
        .variables
        .iter()
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    context.apply(document.initial_context(overrides).into_inner());
    context
}

async fn drain_queue<I>(
    tasks: I,
    scheduler_config: SchedulerConfig,
    executor: TaskExecutor,
    context: &ExecutionContext,
) -> Result<QueueSummary>
where
    I: IntoIterator<Item = (Task, Priority)>,
{
    let mut scheduler = TaskScheduler::new(scheduler_config);
    let ids = scheduler.batch_enqueue(tasks);
    info!("Enqueued {} tasks", ids.len());

    let runner = QueueRunner::new(scheduler, executor);
    let report = runner
        .run_until_idle(context)
        .await
        .context("Queue runner failed")?;
    let records = runner.records().await;

    Ok(QueueSummary { report, records })
}
