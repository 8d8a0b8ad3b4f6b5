// ABOUTME: Queue runner draining a task scheduler through the task executor
// ABOUTME: Single scheduling loop that sleeps through retry backoff until the queue is idle

use chrono::Utc;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use super::context::ExecutionContext;
use super::error::Result;
use super::executor::TaskExecutor;
use super::model::Task;
use super::result::elapsed_since;
use super::scheduler::{Priority, QueueStats, TaskId, TaskRecord, TaskScheduler, TaskState};

/// Summary of one `run_until_idle` drain.
#[derive(Debug, Clone, Serialize)]
pub struct QueueReport {
    /// Task executions, counting every retry.
    pub executions: usize,
    pub completed: usize,
    pub failed: usize,
    pub retried: usize,
    pub stats: QueueStats,
    pub duration: Duration,
}

impl QueueReport {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

pub struct QueueRunner {
    scheduler: Mutex<TaskScheduler>,
    executor: TaskExecutor,
}

impl QueueRunner {
    pub fn new(scheduler: TaskScheduler, executor: TaskExecutor) -> Self {
        Self {
            scheduler: Mutex::new(scheduler),
            executor,
        }
    }

    pub async fn enqueue(&self, task: Task, priority: Priority) -> TaskId {
        self.scheduler.lock().await.enqueue(task, priority)
    }

    pub async fn stats(&self) -> QueueStats {
        self.scheduler.lock().await.get_stats()
    }

    pub async fn records(&self) -> Vec<TaskRecord> {
        self.scheduler.lock().await.records().cloned().collect()
    }

    pub fn into_scheduler(self) -> TaskScheduler {
        self.scheduler.into_inner()
    }

    /// Execute queued records until nothing is queued or waiting on a retry.
    /// Each attempt runs against a fresh copy of `base_context`.
    #[instrument(skip(self, base_context))]
    pub async fn run_until_idle(&self, base_context: &ExecutionContext) -> Result<QueueReport> {
        let started_at = Utc::now();
        let mut executions = 0;
        let mut completed = 0;
        let mut failed = 0;
        let mut retried = 0;

        loop {
            let next = self.scheduler.lock().await.dequeue_next();

            let record = match next {
                Some(record) => record,
                None => {
                    let wait = self.scheduler.lock().await.next_retry_in();
                    match wait {
                        Some(delay) => {
                            debug!("Waiting {:?} for the next retry", delay);
                            sleep(delay).await;
                            continue;
                        }
                        None => break,
                    }
                }
            };

            executions += 1;
            info!(
                "Running queued task {} (attempt {}, {} priority)",
                record.task.id,
                record.attempts + 1,
                record.priority
            );

            let outcome = self.executor.execute_task(&record.task, base_context).await;

            if outcome.success {
                self.scheduler.lock().await.complete(record.id, outcome)?;
                completed += 1;
                continue;
            }

            let error = outcome
                .first_error()
                .unwrap_or("task failed")
                .to_string();
            let state = self.scheduler.lock().await.fail(record.id, error)?;

            match state {
                TaskState::Queued => retried += 1,
                _ => {
                    warn!("Task {} exhausted its retries", record.task.id);
                    failed += 1;
                }
            }
        }

        let stats = self.stats().await;
        info!(
            "Queue idle: {} executions, {} completed, {} failed, {} retries",
            executions, completed, failed, retried
        );

        Ok(QueueReport {
            executions,
            completed,
            failed,
            retried,
            stats,
            duration: elapsed_since(started_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::model::Step;
    use crate::engine::scheduler::SchedulerConfig;
    use crate::tools::{ToolRegistry, ToolSettings};
    use serde_json::json;
    use std::sync::Arc;

    fn runner(max_retries: u32) -> QueueRunner {
        let tools = Arc::new(ToolRegistry::with_builtins(ToolSettings::default()));
        let scheduler = TaskScheduler::new(SchedulerConfig {
            max_retries,
            backoff_base: Duration::from_millis(1),
            max_backoff: Duration::from_millis(10),
        });
        QueueRunner::new(scheduler, TaskExecutor::new(tools))
    }

    #[tokio::test]
    async fn test_drains_queue_in_priority_order() {
        let runner = runner(3);
        let low = runner
            .enqueue(
                Task::new("low").with_step(Step::new("echo").with_param("message", json!("l"))),
                Priority::Low,
            )
            .await;
        let high = runner
            .enqueue(
                Task::new("high").with_step(Step::new("echo").with_param("message", json!("h"))),
                Priority::High,
            )
            .await;

        let report = runner.run_until_idle(&ExecutionContext::new()).await.unwrap();

        assert!(report.is_success());
        assert_eq!(report.completed, 2);
        let scheduler = runner.into_scheduler();
        assert!(scheduler.get(high).unwrap().updated_at <= scheduler.get(low).unwrap().updated_at);
    }

    #[tokio::test]
    async fn test_failing_task_retried_until_budget_spent() {
        let runner = runner(3);
        let id = runner
            .enqueue(
                Task::new("broken")
                    .with_step(Step::new("calculate").with_param("expression", json!("1/0"))),
                Priority::Normal,
            )
            .await;

        let report = runner.run_until_idle(&ExecutionContext::new()).await.unwrap();

        assert_eq!(report.executions, 3);
        assert_eq!(report.retried, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.stats.failed, 1);

        let scheduler = runner.into_scheduler();
        let record = scheduler.get(id).unwrap();
        assert_eq!(record.state, TaskState::Failed);
        assert!(record.last_error.as_deref().unwrap().contains("zero"));
    }
}
