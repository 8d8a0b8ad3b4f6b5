// ABOUTME: Priority task queue with explicit record lifecycle and retry bookkeeping
// ABOUTME: Failed attempts are re-queued with exponential backoff until the retry budget is spent

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::SchedulerError;
use super::model::Task;
use super::result::TaskOutcome;

pub type Result<T> = std::result::Result<T, SchedulerError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Normal,
    Low,
}

impl Priority {
    /// Tiers in dequeue order.
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Normal, Priority::Low];

    fn tier(self) -> usize {
        match self {
            Priority::High => 0,
            Priority::Normal => 1,
            Priority::Low => 2,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Normal => write!(f, "normal"),
            Priority::Low => write!(f, "low"),
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "normal" => Ok(Priority::Normal),
            "low" => Ok(Priority::Low),
            other => Err(format!("Unknown priority: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Pending,
    Queued,
    Running,
    Completed,
    Failed,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Pending => write!(f, "pending"),
            TaskState::Queued => write!(f, "queued"),
            TaskState::Running => write!(f, "running"),
            TaskState::Completed => write!(f, "completed"),
            TaskState::Failed => write!(f, "failed"),
        }
    }
}

/// A task plus its scheduling metadata.
#[derive(Debug, Clone, Serialize)]
pub struct TaskRecord {
    pub id: TaskId,
    #[serde(serialize_with = "serialize_task_id")]
    pub task: Task,
    pub priority: Priority,
    pub state: TaskState,
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Earliest instant a re-queued record may be dequeued again.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskOutcome>,
}

fn serialize_task_id<S: Serializer>(task: &Task, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&task.id)
}

impl TaskRecord {
    fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        self.retry_at.map_or(true, |retry_at| retry_at <= now)
    }

    fn transition(&mut self, state: TaskState) {
        debug!("Task record {} ({}): {} -> {}", self.id, self.task.id, self.state, state);
        self.state = state;
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Failed attempts allowed before a record becomes terminally failed.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_backoff_base", with = "humantime_serde")]
    pub backoff_base: Duration,

    #[serde(default = "default_max_backoff", with = "humantime_serde")]
    pub max_backoff: Duration,
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base() -> Duration {
    Duration::from_secs(1)
}

fn default_max_backoff() -> Duration {
    Duration::from_secs(300) // 5 minutes
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_base: default_backoff_base(),
            max_backoff: default_max_backoff(),
        }
    }
}

impl SchedulerConfig {
    /// Delay before the retry that follows failed attempt number `attempts`:
    /// `backoff_base * 2^attempts`, capped at `max_backoff`.
    pub fn backoff_delay(&self, attempts: u32) -> Duration {
        2u32.checked_pow(attempts)
            .and_then(|factor| self.backoff_base.checked_mul(factor))
            .map_or(self.max_backoff, |delay| delay.min(self.max_backoff))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub total: usize,
    pub pending: usize,
    pub queued: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
}

pub struct TaskScheduler {
    config: SchedulerConfig,
    records: IndexMap<TaskId, TaskRecord>,
    tiers: [VecDeque<TaskId>; 3],
}

impl TaskScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            records: IndexMap::new(),
            tiers: Default::default(),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Create a record for `task` and queue it at the back of its tier.
    pub fn enqueue(&mut self, task: Task, priority: Priority) -> TaskId {
        let now = Utc::now();
        let id = TaskId::new();
        let mut record = TaskRecord {
            id,
            task,
            priority,
            state: TaskState::Pending,
            attempts: 0,
            created_at: now,
            updated_at: now,
            retry_at: None,
            last_error: None,
            result: None,
        };

        info!("Enqueued task {} as {} ({} priority)", record.task.id, id, priority);
        record.transition(TaskState::Queued);

        self.records.insert(id, record);
        self.tiers[priority.tier()].push_back(id);
        id
    }

    pub fn batch_enqueue<I>(&mut self, tasks: I) -> Vec<TaskId>
    where
        I: IntoIterator<Item = (Task, Priority)>,
    {
        tasks
            .into_iter()
            .map(|(task, priority)| self.enqueue(task, priority))
            .collect()
    }

    /// Take the oldest eligible record from the highest non-empty tier and mark it running.
    pub fn dequeue_next(&mut self) -> Option<TaskRecord> {
        let now = Utc::now();

        for tier in self.tiers.iter_mut() {
            let records = &self.records;
            let position = tier.iter().position(|id| {
                records
                    .get(id)
                    .map_or(false, |record| record.is_eligible(now))
            });

            if let Some(id) = position.and_then(|position| tier.remove(position)) {
                if let Some(record) = self.records.get_mut(&id) {
                    record.retry_at = None;
                    record.transition(TaskState::Running);
                    debug!("Dequeued task {} (attempt {})", record.task.id, record.attempts + 1);
                    return Some(record.clone());
                }
            }
        }

        None
    }

    pub fn batch_dequeue(&mut self, count: usize) -> Vec<TaskRecord> {
        let mut records = Vec::with_capacity(count);
        while records.len() < count {
            match self.dequeue_next() {
                Some(record) => records.push(record),
                None => break,
            }
        }
        records
    }

    /// Mark a running record as completed.
    pub fn complete(&mut self, task_id: TaskId, result: TaskOutcome) -> Result<()> {
        let record = self.running_record(task_id, "complete")?;
        record.result = Some(result);
        record.transition(TaskState::Completed);
        info!("Task {} completed after {} failed attempts", record.task.id, record.attempts);
        Ok(())
    }

    /// Record a failed attempt. The record is re-queued with backoff while the
    /// retry budget lasts and becomes terminally failed once it is spent.
    pub fn fail(&mut self, task_id: TaskId, error: impl Into<String>) -> Result<TaskState> {
        let config = self.config.clone();
        let record = self.running_record(task_id, "fail")?;

        let error = error.into();
        record.attempts += 1;
        record.last_error = Some(error.clone());

        if record.attempts >= config.max_retries {
            record.transition(TaskState::Failed);
            warn!(
                "Task {} failed after {} attempts: {}",
                record.task.id, record.attempts, error
            );
            return Ok(TaskState::Failed);
        }

        let delay = config.backoff_delay(record.attempts);
        let delay_chrono = chrono::Duration::from_std(delay)
            .unwrap_or_else(|_| chrono::Duration::seconds(i64::from(u32::MAX)));
        record.retry_at = Some(Utc::now() + delay_chrono);
        record.transition(TaskState::Queued);
        warn!(
            "Task {} failed (attempt {}/{}), retrying in {:?}: {}",
            record.task.id, record.attempts, config.max_retries, delay, error
        );

        let tier = record.priority.tier();
        self.tiers[tier].push_back(task_id);
        Ok(TaskState::Queued)
    }

    fn running_record(&mut self, task_id: TaskId, operation: &'static str) -> Result<&mut TaskRecord> {
        let record = self
            .records
            .get_mut(&task_id)
            .ok_or(SchedulerError::UnknownTask { task_id })?;

        if record.state != TaskState::Running {
            return Err(SchedulerError::InvalidTransition {
                task_id,
                operation,
                state: record.state,
            });
        }

        Ok(record)
    }

    pub fn get(&self, task_id: TaskId) -> Option<&TaskRecord> {
        self.records.get(&task_id)
    }

    /// All records in enqueue order.
    pub fn records(&self) -> impl Iterator<Item = &TaskRecord> {
        self.records.values()
    }

    /// Time until the earliest waiting retry becomes eligible, or `None` when
    /// nothing queued is waiting on backoff.
    pub fn next_retry_in(&self) -> Option<Duration> {
        let now = Utc::now();
        self.records
            .values()
            .filter(|record| record.state == TaskState::Queued)
            .filter_map(|record| record.retry_at)
            .min()
            .map(|retry_at| (retry_at - now).to_std().unwrap_or(Duration::ZERO))
    }

    pub fn has_queued(&self) -> bool {
        self.tiers.iter().any(|tier| !tier.is_empty())
    }

    pub fn get_stats(&self) -> QueueStats {
        let mut stats = QueueStats {
            total: self.records.len(),
            ..Default::default()
        };

        for record in self.records.values() {
            match record.state {
                TaskState::Pending => stats.pending += 1,
                TaskState::Queued => stats.queued += 1,
                TaskState::Running => stats.running += 1,
                TaskState::Completed => stats.completed += 1,
                TaskState::Failed => stats.failed += 1,
            }
        }

        stats
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}
