//! Task specifications and outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::{SchedulerError, SchedulerResult};
use crate::phase::TaskName;

/// Default soft time limit (Celery-style: a bit under the hard limit).
pub const DEFAULT_SOFT_TIME_LIMIT: Duration = Duration::from_secs(540);
/// Default hard time limit.
pub const DEFAULT_HARD_TIME_LIMIT: Duration = Duration::from_secs(600);

/// Unique identifier for a submitted task (UUID v4).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(String);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
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

/// One unit of work bound for a phase queue.
///
/// Immutable after creation; the scheduler owns consumption state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    pub id: TaskId,
    pub name: TaskName,
    pub payload: serde_json::Value,
    pub soft_time_limit: Duration,
    pub hard_time_limit: Duration,
}

impl TaskSpec {
    /// Create a task with the default time limits.
    pub fn new(name: TaskName, payload: serde_json::Value) -> Self {
        Self {
            id: TaskId::new(),
            name,
            payload,
            soft_time_limit: DEFAULT_SOFT_TIME_LIMIT,
            hard_time_limit: DEFAULT_HARD_TIME_LIMIT,
        }
    }

    /// Override the time limits. The soft limit must be strictly below the
    /// hard limit.
    pub fn with_time_limits(mut self, soft: Duration, hard: Duration) -> SchedulerResult<Self> {
        if soft >= hard {
            return Err(SchedulerError::InvalidTimeLimits { soft, hard });
        }
        self.soft_time_limit = soft;
        self.hard_time_limit = hard;
        Ok(self)
    }
}

/// Why a task did not produce a result.
#[derive(Error, Debug, Clone)]
pub enum TaskFailure {
    /// The executor reported an error
    #[error("task failed: {0}")]
    Failed(String),

    /// The hard time limit elapsed; in-flight state is lost and the task
    /// is not resumable
    #[error("task killed after hard time limit {0:?}")]
    HardTimeout(Duration),
}

/// Terminal result of one task submission. At-most-once: a failed task is
/// reported, never resubmitted by the scheduler.
pub type TaskOutcome = Result<serde_json::Value, TaskFailure>;

/// Handle returned by `submit`, used to await the task's outcome.
pub struct TaskHandle {
    pub task_id: TaskId,
    pub(crate) rx: oneshot::Receiver<TaskOutcome>,
}

impl TaskHandle {
    /// Wait for the task to finish.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::OutcomeDropped` if the pool shut down
    /// before the task ran.
    pub async fn outcome(self) -> SchedulerResult<TaskOutcome> {
        let task_id = self.task_id.clone();
        self.rx
            .await
            .map_err(|_| SchedulerError::OutcomeDropped(task_id))
    }
}
