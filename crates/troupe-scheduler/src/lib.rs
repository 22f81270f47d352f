//! # Troupe Scheduler
//!
//! Phase-partitioned task scheduling for agent invocations.
//!
//! Each logical pipeline phase binds to one isolated queue served by its own
//! worker pool. Task names follow `"<phase>.<operation>"` and are routed by
//! the phase prefix. Workers pull one task at a time, enforce soft
//! (cooperative) and hard (forced) time limits, and are recycled after a
//! configured number of tasks.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use troupe_scheduler::{PhaseScheduler, SchedulerConfig, TaskExecutor, TaskName, TaskSpec};
//!
//! async fn example(executor: Arc<dyn TaskExecutor>) -> Result<(), Box<dyn std::error::Error>> {
//!     let scheduler = PhaseScheduler::start(SchedulerConfig::default(), executor);
//!
//!     let name = TaskName::parse("discovery.analyze_requirements")?;
//!     let task = TaskSpec::new(name, serde_json::json!({"description": "a todo app"}));
//!     let handle = scheduler.submit(task).await?;
//!
//!     let outcome = handle.outcome().await?;
//!     println!("task finished: {outcome:?}");
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod error;
pub mod phase;
pub mod pool;
pub mod scheduler;
pub mod task;

pub use cancel::SoftCancel;
pub use error::{SchedulerError, SchedulerResult};
pub use phase::{Phase, TaskName};
pub use pool::{PoolConfig, PoolStats, TaskExecutor, WorkerPool};
pub use scheduler::{PhaseScheduler, SchedulerConfig};
pub use task::{TaskFailure, TaskHandle, TaskId, TaskOutcome, TaskSpec};
