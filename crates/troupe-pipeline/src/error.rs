//! Error types for pipeline orchestration.

use thiserror::Error;
use troupe_scheduler::SchedulerError;

use crate::request::RequestStatus;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that can occur while driving a request through the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A stage failed; the original failure is preserved as the source.
    /// The first stage failure aborts the remaining stages.
    #[error("stage '{stage}' failed: {source}")]
    Stage {
        stage: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Attempted a status change the state machine forbids
    #[error("invalid status transition from '{from}' to '{to}'")]
    InvalidTransition {
        from: RequestStatus,
        to: RequestStatus,
    },

    /// Task submission to the scheduler failed
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

impl PipelineError {
    /// Wrap a stage failure, keeping the underlying error intact.
    pub fn stage(
        stage: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Stage {
            stage: stage.into(),
            source: Box::new(source),
        }
    }
}
