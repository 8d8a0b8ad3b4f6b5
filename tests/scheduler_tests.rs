// ABOUTME: Integration tests for the priority task queue and queue runner
// ABOUTME: Tests tier ordering, retry budgets, backoff waits, and draining through the executor

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use toolflow::engine::{
    ExecutionContext, Priority, QueueRunner, SchedulerConfig, SchedulerError, Step, Task,
    TaskExecutor, TaskScheduler, TaskState,
};

mod common;
use common::SpyTools;

fn task(id: &str) -> Task {
    Task::new(id).with_step(Step::new("echo").with_param("label", json!(id)))
}

fn fast_config(max_retries: u32) -> SchedulerConfig {
    SchedulerConfig {
        max_retries,
        backoff_base: Duration::from_millis(1),
        max_backoff: Duration::from_millis(20),
    }
}

#[test]
fn test_high_priority_wins_over_low() {
    let mut scheduler = TaskScheduler::default();
    scheduler.enqueue(task("T1"), Priority::Low);
    scheduler.enqueue(task("T2"), Priority::High);

    let next = scheduler.dequeue_next().unwrap();
    assert_eq!(next.task.id, "T2");
    assert_eq!(scheduler.get_stats().running, 1);
    assert_eq!(scheduler.get_stats().queued, 1);
}

#[test]
fn test_fail_twice_requeues_then_third_is_terminal() {
    let mut scheduler = TaskScheduler::new(SchedulerConfig {
        max_retries: 3,
        backoff_base: Duration::ZERO,
        max_backoff: Duration::ZERO,
    });
    let id = scheduler.enqueue(task("T"), Priority::Normal);

    let mut observed = Vec::new();
    for _ in 0..3 {
        scheduler.dequeue_next().unwrap();
        let state = scheduler.fail(id, "boom").unwrap();
        observed.push((state, scheduler.get(id).unwrap().attempts));
    }

    assert_eq!(
        observed,
        vec![
            (TaskState::Queued, 1),
            (TaskState::Queued, 2),
            (TaskState::Failed, 3),
        ]
    );
    assert!(scheduler.dequeue_next().is_none());
    assert!(matches!(
        scheduler.fail(id, "again"),
        Err(SchedulerError::InvalidTransition { .. })
    ));
}

#[test]
fn test_retry_goes_to_back_of_its_tier() {
    let mut scheduler = TaskScheduler::new(SchedulerConfig {
        max_retries: 5,
        backoff_base: Duration::ZERO,
        max_backoff: Duration::ZERO,
    });
    let first = scheduler.enqueue(task("first"), Priority::Normal);
    scheduler.enqueue(task("second"), Priority::Normal);
    scheduler.enqueue(task("urgent"), Priority::High);

    assert_eq!(scheduler.dequeue_next().unwrap().task.id, "urgent");
    assert_eq!(scheduler.dequeue_next().unwrap().task.id, "first");
    scheduler.fail(first, "retry me").unwrap();

    let order: Vec<String> = scheduler
        .batch_dequeue(5)
        .into_iter()
        .map(|record| record.task.id)
        .collect();
    assert_eq!(order, vec!["second", "first"]);
}

#[test]
fn test_records_listed_in_enqueue_order() {
    let mut scheduler = TaskScheduler::default();
    let ids = scheduler.batch_enqueue(vec![
        (task("a"), Priority::Low),
        (task("b"), Priority::High),
    ]);

    let listed: Vec<_> = scheduler.records().map(|record| record.id).collect();
    assert_eq!(listed, ids);
    assert!(scheduler.records().all(|record| record.state == TaskState::Queued));
}

#[tokio::test]
async fn test_runner_retries_flaky_task_until_success() {
    let spy = Arc::new(SpyTools::new().with_flaky_failures(2));
    let mut scheduler = TaskScheduler::new(fast_config(3));
    let id = scheduler.enqueue(Task::new("flaky").with_step(Step::new("flaky")), Priority::Normal);

    let runner = QueueRunner::new(scheduler, TaskExecutor::new(spy.clone()));
    let report = runner.run_until_idle(&ExecutionContext::new()).await.unwrap();

    assert!(report.is_success());
    assert_eq!(report.executions, 3);
    assert_eq!(report.retried, 2);
    assert_eq!(spy.call_count("flaky"), 3);

    let scheduler = runner.into_scheduler();
    let record = scheduler.get(id).unwrap();
    assert_eq!(record.state, TaskState::Completed);
    assert_eq!(record.attempts, 2);
    assert_eq!(record.last_error.as_deref(), Some("flaky failure 2"));
}

#[tokio::test]
async fn test_runner_executes_tiers_in_order() {
    let spy = Arc::new(SpyTools::new());
    let mut scheduler = TaskScheduler::new(fast_config(1));
    scheduler.batch_enqueue(vec![
        (task("low-1"), Priority::Low),
        (task("normal-1"), Priority::Normal),
        (task("high-1"), Priority::High),
        (task("normal-2"), Priority::Normal),
    ]);

    let runner = QueueRunner::new(scheduler, TaskExecutor::new(spy.clone()));
    runner.run_until_idle(&ExecutionContext::new()).await.unwrap();

    assert_eq!(
        spy.call_order(),
        vec!["high-1", "normal-1", "normal-2", "low-1"]
    );
}

#[tokio::test]
async fn test_runner_gives_each_attempt_a_fresh_context() {
    let spy = Arc::new(SpyTools::new());
    let mut scheduler = TaskScheduler::new(fast_config(1));
    scheduler.enqueue(
        Task::new("writer").with_step(Step::new("store").with_param("value", json!("x")).with_result_name("shared")),
        Priority::High,
    );
    scheduler.enqueue(
        Task::new("reader").with_step(Step::new("echo").with_param("seen", json!("{{shared}}"))),
        Priority::Low,
    );

    let base = ExecutionContext::new();
    let runner = QueueRunner::new(scheduler, TaskExecutor::new(spy.clone()));
    runner.run_until_idle(&base).await.unwrap();

    let calls = spy.calls();
    assert_eq!(calls[1].1["seen"], json!("{{shared}}"));
    assert!(base.is_empty());
}
