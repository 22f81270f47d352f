//! # Troupe Pipeline
//!
//! Request-level orchestration over troupe agents.
//!
//! The [`RequestOrchestrator`] drives an ordered sequence of pipeline
//! stages per incoming request, merging each stage's usage into the
//! running [`RequestState`] and short-circuiting on the first failure
//! while preserving completed results.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use troupe_core::UsageTracker;
//! use troupe_pipeline::{AgentStage, PipelineRequest, RequestOrchestrator};
//! use troupe_core::Agent;
//!
//! async fn example(planner: Arc<dyn Agent>, coder: Arc<dyn Agent>) {
//!     let tracker = Arc::new(UsageTracker::new());
//!     let orchestrator = RequestOrchestrator::new(vec![
//!         Arc::new(AgentStage::new("planning", planner, Arc::clone(&tracker))),
//!         Arc::new(AgentStage::new("coding", coder, tracker)),
//!     ]);
//!
//!     match orchestrator.submit(PipelineRequest::new("a todo app")).await {
//!         Ok(state) => println!("completed with {} stages", state.stage_results.len()),
//!         Err(err) => eprintln!("pipeline failed: {err}"),
//!     }
//! }
//! ```

pub mod error;
pub mod orchestrator;
pub mod request;
pub mod stage;

pub use error::{PipelineError, PipelineResult};
pub use orchestrator::RequestOrchestrator;
pub use request::{PipelineRequest, RequestId, RequestState, RequestStatus};
pub use stage::{AgentStage, ScheduledStage, Stage, StageInput, StageResult};
