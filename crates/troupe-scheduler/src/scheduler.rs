//! The phase scheduler: routes tasks to isolated per-phase pools.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::error::SchedulerResult;
use crate::phase::Phase;
use crate::pool::{PoolConfig, PoolStats, TaskExecutor, WorkerPool};
use crate::task::{TaskHandle, TaskSpec};

/// Per-phase pool configuration with a shared default.
///
/// Concurrency per phase is uncoupled from other phases.
#[derive(Debug, Clone, Default)]
pub struct SchedulerConfig {
    default_pool: PoolConfig,
    overrides: HashMap<Phase, PoolConfig>,
}

impl SchedulerConfig {
    pub fn new(default_pool: PoolConfig) -> Self {
        Self {
            default_pool,
            overrides: HashMap::new(),
        }
    }

    /// Override the pool configuration for one phase.
    pub fn with_phase(mut self, phase: Phase, config: PoolConfig) -> Self {
        self.overrides.insert(phase, config);
        self
    }

    fn pool_for(&self, phase: Phase) -> PoolConfig {
        self.overrides
            .get(&phase)
            .cloned()
            .unwrap_or_else(|| self.default_pool.clone())
    }
}

/// Maps `"<phase>.*"` task names onto dedicated phase queues.
///
/// Each phase gets one isolated [`WorkerPool`]; submission routes by the
/// task name's phase prefix.
pub struct PhaseScheduler {
    pools: HashMap<Phase, WorkerPool>,
}

impl PhaseScheduler {
    /// Start one pool per phase, all serving the same executor.
    pub fn start(config: SchedulerConfig, executor: Arc<dyn TaskExecutor>) -> Self {
        let pools = Phase::all()
            .into_iter()
            .map(|phase| {
                let pool = WorkerPool::start(phase, config.pool_for(phase), Arc::clone(&executor));
                (phase, pool)
            })
            .collect();
        info!("phase_scheduler_started");
        Self { pools }
    }

    /// Enqueue a task on its phase's queue.
    pub async fn submit(&self, spec: TaskSpec) -> SchedulerResult<TaskHandle> {
        let phase = spec.name.phase();
        // Pools exist for every phase by construction.
        self.pools[&phase].submit(spec).await
    }

    /// Snapshot all pools' counters.
    pub fn stats(&self) -> HashMap<Phase, PoolStats> {
        self.pools
            .iter()
            .map(|(phase, pool)| (*phase, pool.stats()))
            .collect()
    }

    /// Close every queue and wait for in-flight tasks to finish.
    pub async fn shutdown(self) {
        for (_, pool) in self.pools {
            pool.shutdown().await;
        }
        info!("phase_scheduler_stopped");
    }
}
