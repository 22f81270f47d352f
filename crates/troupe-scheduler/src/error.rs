//! Error types for scheduler operations.

use std::time::Duration;
use thiserror::Error;

use crate::phase::Phase;
use crate::task::TaskId;

/// Result type for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Errors that can occur during scheduling.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// Task name does not follow `"<phase>.<operation>"`
    #[error("invalid task name '{name}': {reason}")]
    InvalidTaskName { name: String, reason: String },

    /// Task name's prefix is not a known phase
    #[error("unknown phase '{0}'")]
    UnknownPhase(String),

    /// Soft time limit must be strictly below the hard limit
    #[error("invalid time limits: soft {soft:?} must be below hard {hard:?}")]
    InvalidTimeLimits { soft: Duration, hard: Duration },

    /// The phase's queue is closed; the pool has been shut down
    #[error("worker pool for phase '{0}' is closed")]
    PoolClosed(Phase),

    /// The worker handling the task went away before reporting an outcome
    #[error("outcome for task {0} was dropped")]
    OutcomeDropped(TaskId),
}
