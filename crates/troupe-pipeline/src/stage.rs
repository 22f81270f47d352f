//! Pipeline stages and the adapters that run agents in them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use troupe_core::{Agent, UsageRecord, UsageTracker};
use troupe_scheduler::{PhaseScheduler, TaskName, TaskSpec};

use crate::error::{PipelineError, PipelineResult};
use crate::request::PipelineRequest;

/// What a stage sees when it runs: the original request plus the outputs
/// of every prior stage (strict sequential dependency).
pub struct StageInput<'a> {
    pub request: &'a PipelineRequest,
    pub prior: &'a [StageResult],
}

impl StageInput<'_> {
    /// Output of a prior stage by name.
    pub fn output_of(&self, stage: &str) -> Option<&serde_json::Value> {
        self.prior
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| &r.output)
    }

    /// All prior outputs folded into one object keyed by stage name.
    pub fn accumulated(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .prior
            .iter()
            .map(|r| (r.stage.clone(), r.output.clone()))
            .collect();
        serde_json::Value::Object(map)
    }

    /// The payload handed to agents: request fields plus prior outputs.
    pub fn task_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "description": self.request.description,
            "context": self.request.context,
            "prior": self.accumulated(),
        })
    }
}

/// Output of one completed stage, with the usage it incurred.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: String,
    pub output: serde_json::Value,
    pub usage: Vec<UsageRecord>,
}

/// One sequential unit of work in the orchestrator's pipeline.
///
/// Stages are strictly ordered; any parallelism lives inside a stage
/// (e.g. fanning tasks out within one scheduler phase).
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;

    /// Run the stage to completion.
    ///
    /// # Errors
    ///
    /// A returned error aborts the remaining pipeline; the orchestrator
    /// preserves it unmodified for the caller.
    async fn run(&self, input: StageInput<'_>) -> PipelineResult<StageResult>;
}

/// Stage adapter invoking a single agent's `process_task` directly.
///
/// The tracker is the same instance wired into the agent's LLM client, so
/// records that appear during the call are attributed to this stage.
pub struct AgentStage {
    name: String,
    agent: Arc<dyn Agent>,
    tracker: Arc<UsageTracker>,
}

impl AgentStage {
    pub fn new(name: impl Into<String>, agent: Arc<dyn Agent>, tracker: Arc<UsageTracker>) -> Self {
        Self {
            name: name.into(),
            agent,
            tracker,
        }
    }
}

#[async_trait]
impl Stage for AgentStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, input: StageInput<'_>) -> PipelineResult<StageResult> {
        let recorded_before = self.tracker.records().len();
        let output = self
            .agent
            .process_task(input.task_payload())
            .await
            .map_err(|err| PipelineError::stage(&self.name, err))?;

        // Stages run sequentially, so everything recorded since the call
        // started belongs to this stage.
        let mut records = self.tracker.records();
        let usage = records.split_off(recorded_before.min(records.len()));

        Ok(StageResult {
            stage: self.name.clone(),
            output,
            usage,
        })
    }
}

/// Stage adapter submitting one task to the phase scheduler and awaiting
/// its outcome.
pub struct ScheduledStage {
    name: String,
    scheduler: Arc<PhaseScheduler>,
    task_name: TaskName,
    time_limits: Option<(Duration, Duration)>,
}

impl ScheduledStage {
    pub fn new(
        name: impl Into<String>,
        scheduler: Arc<PhaseScheduler>,
        task_name: TaskName,
    ) -> Self {
        Self {
            name: name.into(),
            scheduler,
            task_name,
            time_limits: None,
        }
    }

    /// Override the task's soft/hard time limits.
    pub fn with_time_limits(mut self, soft: Duration, hard: Duration) -> Self {
        self.time_limits = Some((soft, hard));
        self
    }
}

#[async_trait]
impl Stage for ScheduledStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, input: StageInput<'_>) -> PipelineResult<StageResult> {
        let mut spec = TaskSpec::new(self.task_name.clone(), input.task_payload());
        if let Some((soft, hard)) = self.time_limits {
            spec = spec.with_time_limits(soft, hard)?;
        }

        let handle = self.scheduler.submit(spec).await?;
        let output = handle
            .outcome()
            .await?
            .map_err(|failure| PipelineError::stage(&self.name, failure))?;

        Ok(StageResult {
            stage: self.name.clone(),
            output,
            usage: Vec::new(),
        })
    }
}
