//! Request state and its monotonic status machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use troupe_core::UsageSummary;

use crate::error::{PipelineError, PipelineResult};
use crate::stage::StageResult;

/// Unique identifier for a pipeline request (UUID v4).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Request lifecycle status.
///
/// Transitions are monotonic: `Pending → InProgress → {Completed | Failed}`.
/// Terminal states never change again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Failed)
    }

    pub fn can_transition_to(&self, to: RequestStatus) -> bool {
        matches!(
            (self, to),
            (RequestStatus::Pending, RequestStatus::InProgress)
                | (RequestStatus::InProgress, RequestStatus::Completed)
                | (RequestStatus::InProgress, RequestStatus::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::InProgress => "in_progress",
            RequestStatus::Completed => "completed",
            RequestStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An incoming pipeline request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRequest {
    pub description: String,
    #[serde(default)]
    pub context: serde_json::Value,
}

impl PipelineRequest {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            context: serde_json::Value::Null,
        }
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }
}

/// The orchestrator's view of one request: status, ordered stage results,
/// and accumulated usage.
///
/// Owned exclusively by the orchestrator until terminal; stages never
/// mutate it concurrently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestState {
    pub request_id: RequestId,
    pub status: RequestStatus,
    pub stage_results: Vec<StageResult>,
    pub usage: UsageSummary,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl RequestState {
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            status: RequestStatus::Pending,
            stage_results: Vec::new(),
            usage: UsageSummary::default(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Advance the status, enforcing monotonicity. Entering a terminal
    /// state stamps `completed_at`.
    pub fn transition(&mut self, to: RequestStatus) -> PipelineResult<()> {
        if !self.status.can_transition_to(to) {
            return Err(PipelineError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        if to.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }
}
