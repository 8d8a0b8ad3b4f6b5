// ABOUTME: Workflow orchestrator running tasks sequentially or as a concurrent fan-out
// ABOUTME: Merges task contexts across task boundaries and applies task-level failure policy

use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{info, instrument, warn};

use super::context::ExecutionContext;
use super::executor::{EngineConfig, TaskExecutor};
use super::model::Workflow;
use super::result::{elapsed_since, TaskOutcome, WorkflowOutcome};

#[derive(Clone)]
pub struct WorkflowOrchestrator {
    task_executor: TaskExecutor,
    max_parallel_tasks: Option<usize>,
}

impl WorkflowOrchestrator {
    pub fn new(task_executor: TaskExecutor) -> Self {
        Self {
            task_executor,
            max_parallel_tasks: None,
        }
    }

    pub fn with_config(task_executor: TaskExecutor, config: &EngineConfig) -> Self {
        Self {
            task_executor,
            max_parallel_tasks: config.max_parallel_tasks,
        }
    }

    pub fn with_max_parallel_tasks(mut self, limit: Option<usize>) -> Self {
        self.max_parallel_tasks = limit;
        self
    }

    /// Execute a workflow starting from `initial_context`.
    #[instrument(skip(self, workflow, initial_context), fields(workflow_id = %workflow.id, parallel = workflow.parallel))]
    pub async fn execute_workflow(
        &self,
        workflow: &Workflow,
        initial_context: &ExecutionContext,
    ) -> WorkflowOutcome {
        let started_at = Utc::now();

        info!(
            "Starting workflow {} with {} tasks ({})",
            workflow.id,
            workflow.tasks.len(),
            if workflow.parallel { "parallel" } else { "sequential" }
        );

        let (results, context) = if workflow.parallel {
            self.run_parallel(workflow, initial_context).await
        } else {
            self.run_sequential(workflow, initial_context).await
        };

        let success = results.len() == workflow.tasks.len()
            && results
                .iter()
                .all(|(index, outcome)| outcome.success || workflow.tasks[*index].continue_on_error);

        let task_results: Vec<TaskOutcome> = results.into_iter().map(|(_, outcome)| outcome).collect();

        info!(
            "Workflow {} finished: success={} ({}/{} tasks run)",
            workflow.id,
            success,
            task_results.len(),
            workflow.tasks.len()
        );

        WorkflowOutcome {
            workflow_id: workflow.id.clone(),
            success,
            task_results,
            context,
            started_at,
            duration: elapsed_since(started_at),
        }
    }

    async fn run_sequential(
        &self,
        workflow: &Workflow,
        initial_context: &ExecutionContext,
    ) -> (Vec<(usize, TaskOutcome)>, ExecutionContext) {
        let mut context = initial_context.clone();
        let mut results = Vec::with_capacity(workflow.tasks.len());

        for (index, task) in workflow.tasks.iter().enumerate() {
            let outcome = self.task_executor.execute_task(task, &context).await;
            context = outcome.context.clone();

            let halt = !outcome.success && !task.continue_on_error;
            results.push((index, outcome));

            if halt {
                warn!("Task {} failed, stopping workflow {}", task.id, workflow.id);
                break;
            }
        }

        (results, context)
    }

    async fn run_parallel(
        &self,
        workflow: &Workflow,
        initial_context: &ExecutionContext,
    ) -> (Vec<(usize, TaskOutcome)>, ExecutionContext) {
        let limit = self
            .max_parallel_tasks
            .unwrap_or(workflow.tasks.len())
            .max(1);
        let executor = &self.task_executor;

        // Every task starts from its own copy of the initial context.
        let launch = move |index: usize| {
            let task = &workflow.tasks[index];
            async move { (index, executor.execute_task(task, initial_context).await) }
        };

        let mut next_index = 0;
        let mut in_flight = FuturesUnordered::new();
        while next_index < workflow.tasks.len() && in_flight.len() < limit {
            in_flight.push(launch(next_index));
            next_index += 1;
        }

        let mut context = initial_context.clone();
        let mut results = Vec::with_capacity(workflow.tasks.len());
        let mut halted = false;

        while let Some((index, outcome)) = in_flight.next().await {
            // Writes land in completion order.
            context.apply(outcome.updates.iter().cloned());

            let task = &workflow.tasks[index];
            if !outcome.success && !task.continue_on_error && !halted {
                warn!(
                    "Task {} failed, no further tasks will be launched in workflow {}",
                    task.id, workflow.id
                );
                halted = true;
            }
            results.push((index, outcome));

            if !halted && next_index < workflow.tasks.len() {
                in_flight.push(launch(next_index));
                next_index += 1;
            }
        }

        if next_index < workflow.tasks.len() {
            info!(
                "{} tasks were not launched in workflow {}",
                workflow.tasks.len() - next_index,
                workflow.id
            );
        }

        results.sort_by_key(|(index, _)| *index);
        (results, context)
    }
}
