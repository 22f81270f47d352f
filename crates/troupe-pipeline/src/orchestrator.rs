//! The request orchestrator: drives an ordered stage sequence per request.

use dashmap::DashMap;
use std::sync::Arc;
use tracing::{error, info};

use troupe_core::UsageSummary;

use crate::error::PipelineResult;
use crate::request::{PipelineRequest, RequestId, RequestState, RequestStatus};
use crate::stage::{Stage, StageInput};

/// Sequences pipeline stages for incoming requests.
///
/// Stages are strictly ordered: stage N+1 never starts before stage N
/// resolves, and it consumes the accumulated output of all prior stages.
/// The first stage failure aborts the rest; completed stage results and
/// usage stay queryable through [`status`](RequestOrchestrator::status).
pub struct RequestOrchestrator {
    stages: Vec<Arc<dyn Stage>>,
    requests: DashMap<RequestId, RequestState>,
}

impl RequestOrchestrator {
    pub fn new(stages: Vec<Arc<dyn Stage>>) -> Self {
        Self {
            stages,
            requests: DashMap::new(),
        }
    }

    /// Run a request through every stage in order.
    ///
    /// Returns the terminal [`RequestState`] on success. On a stage
    /// failure the original error is returned to the caller and the
    /// stored state keeps everything completed up to that point.
    ///
    /// Once a stage call starts it runs to completion or failure; client
    /// cancellation is not propagated into in-flight stages.
    pub async fn submit(&self, request: PipelineRequest) -> PipelineResult<RequestState> {
        let request_id = RequestId::new();
        let mut state = RequestState::new(request_id.clone());
        info!(request_id = %request_id, "request_received");

        state.transition(RequestStatus::InProgress)?;
        self.requests.insert(request_id.clone(), state.clone());

        for stage in &self.stages {
            info!(request_id = %request_id, stage = stage.name(), "stage_started");
            let input = StageInput {
                request: &request,
                prior: &state.stage_results,
            };
            match stage.run(input).await {
                Ok(result) => {
                    state.usage.merge(&UsageSummary::from_records(&result.usage));
                    state.stage_results.push(result);
                    self.requests.insert(request_id.clone(), state.clone());
                    info!(request_id = %request_id, stage = stage.name(), "stage_completed");
                }
                Err(err) => {
                    error!(
                        request_id = %request_id,
                        stage = stage.name(),
                        error = %err,
                        "stage_failed"
                    );
                    state.transition(RequestStatus::Failed)?;
                    self.requests.insert(request_id.clone(), state);
                    return Err(err);
                }
            }
        }

        state.transition(RequestStatus::Completed)?;
        self.requests.insert(request_id.clone(), state.clone());
        info!(
            request_id = %request_id,
            stages = state.stage_results.len(),
            total_tokens = state.usage.total_tokens,
            "request_completed"
        );
        Ok(state)
    }

    /// Current state of a request, terminal or not.
    pub fn status(&self, request_id: &RequestId) -> Option<RequestState> {
        self.requests.get(request_id).map(|r| r.clone())
    }

    /// Number of requests this orchestrator has seen.
    pub fn request_count(&self) -> usize {
        self.requests.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::stage::StageResult;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use troupe_core::{AgentError, AgentRole, UsageRecord};

    struct FixedStage {
        name: String,
        output: serde_json::Value,
        usage: Vec<UsageRecord>,
    }

    impl FixedStage {
        fn new(name: &str, output: serde_json::Value) -> Arc<Self> {
            Arc::new(Self {
                name: name.into(),
                output,
                usage: Vec::new(),
            })
        }

        fn with_usage(name: &str, agent: AgentRole, tokens: u64) -> Arc<Self> {
            Arc::new(Self {
                name: name.into(),
                output: serde_json::json!({}),
                usage: vec![UsageRecord {
                    timestamp: Utc::now(),
                    agent,
                    model: "gpt-4".into(),
                    prompt_tokens: tokens,
                    completion_tokens: 0,
                    cost: 0.01,
                }],
            })
        }
    }

    #[async_trait]
    impl Stage for FixedStage {
        fn name(&self) -> &str {
            &self.name
        }

        async fn run(&self, _input: StageInput<'_>) -> PipelineResult<StageResult> {
            Ok(StageResult {
                stage: self.name.clone(),
                output: self.output.clone(),
                usage: self.usage.clone(),
            })
        }
    }

    struct FailingStage;

    #[async_trait]
    impl Stage for FailingStage {
        fn name(&self) -> &str {
            "failing"
        }

        async fn run(&self, _input: StageInput<'_>) -> PipelineResult<StageResult> {
            Err(PipelineError::stage(
                "failing",
                AgentError::TaskFailed("model refused".into()),
            ))
        }
    }

    struct TripwireStage {
        invoked: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Stage for TripwireStage {
        fn name(&self) -> &str {
            "tripwire"
        }

        async fn run(&self, _input: StageInput<'_>) -> PipelineResult<StageResult> {
            self.invoked.store(true, Ordering::SeqCst);
            Ok(StageResult {
                stage: "tripwire".into(),
                output: serde_json::json!({}),
                usage: Vec::new(),
            })
        }
    }

    #[tokio::test]
    async fn successful_pipeline_aggregates_all_stages() {
        let orchestrator = RequestOrchestrator::new(vec![
            FixedStage::with_usage("planning", AgentRole::Planner, 100),
            FixedStage::with_usage("coding", AgentRole::Coder, 300),
        ]);

        let state = orchestrator
            .submit(PipelineRequest::new("a small cli"))
            .await
            .unwrap();

        assert_eq!(state.status, RequestStatus::Completed);
        assert_eq!(state.stage_results.len(), 2);
        assert_eq!(state.stage_results[0].stage, "planning");
        assert_eq!(state.usage.total_calls, 2);
        assert_eq!(state.usage.total_tokens, 400);
        assert_eq!(state.usage.by_agent[&AgentRole::Coder].tokens, 300);
        assert!(state.completed_at.is_some());

        let stored = orchestrator.status(&state.request_id).unwrap();
        assert_eq!(stored.status, RequestStatus::Completed);
    }

    #[tokio::test]
    async fn stage_failure_aborts_and_retains_partials() {
        let invoked = Arc::new(AtomicBool::new(false));
        let orchestrator = RequestOrchestrator::new(vec![
            FixedStage::new("planning", serde_json::json!({"steps": 2})),
            Arc::new(FailingStage),
            Arc::new(TripwireStage {
                invoked: Arc::clone(&invoked),
            }),
        ]);

        let err = orchestrator
            .submit(PipelineRequest::new("doomed"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Stage { ref stage, .. } if stage == "failing"));

        // Stage 3 never ran.
        assert!(!invoked.load(Ordering::SeqCst));

        // Stage 1's result survives in the stored state.
        assert_eq!(orchestrator.request_count(), 1);
        let stored = orchestrator
            .requests
            .iter()
            .next()
            .map(|r| r.value().clone())
            .unwrap();
        assert_eq!(stored.status, RequestStatus::Failed);
        assert_eq!(stored.stage_results.len(), 1);
        assert_eq!(stored.stage_results[0].stage, "planning");
        assert!(stored.completed_at.is_some());
    }

    #[tokio::test]
    async fn later_stages_see_prior_outputs() {
        struct EchoPrior;

        #[async_trait]
        impl Stage for EchoPrior {
            fn name(&self) -> &str {
                "echo"
            }

            async fn run(&self, input: StageInput<'_>) -> PipelineResult<StageResult> {
                Ok(StageResult {
                    stage: "echo".into(),
                    output: input.accumulated(),
                    usage: Vec::new(),
                })
            }
        }

        let orchestrator = RequestOrchestrator::new(vec![
            FixedStage::new("first", serde_json::json!({"n": 1})),
            Arc::new(EchoPrior),
        ]);

        let state = orchestrator
            .submit(PipelineRequest::new("chain"))
            .await
            .unwrap();
        assert_eq!(state.stage_results[1].output["first"]["n"], 1);
    }
}
