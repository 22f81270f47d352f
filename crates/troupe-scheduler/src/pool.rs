//! Worker pools: isolated execution units serving one phase queue each.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use troupe_core::AgentResult;

use crate::cancel::{soft_cancel_pair, SoftCancel};
use crate::error::{SchedulerError, SchedulerResult};
use crate::phase::Phase;
use crate::task::{TaskFailure, TaskHandle, TaskOutcome, TaskSpec};

/// Worker-side consumer of the phase queue.
///
/// The scheduler depends on this capability shape only; in practice the
/// executor maps operations onto agents and runs `process_task`.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Run one task to completion.
    ///
    /// `cancel` trips when the soft time limit elapses; the executor should
    /// observe it and wind down gracefully. The hard limit is enforced by
    /// the worker and is not observable from inside.
    async fn execute(&self, task: TaskSpec, cancel: SoftCancel) -> AgentResult<serde_json::Value>;
}

/// Configuration for one phase's pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of parallel workers serving the queue
    pub concurrency: usize,
    /// Tasks a worker handles before being torn down and replaced
    pub max_tasks_before_recycle: usize,
    /// Queue capacity; `submit` blocks when the queue is full
    pub queue_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            max_tasks_before_recycle: 50,
            queue_capacity: 64,
        }
    }
}

/// Snapshot of a pool's lifetime counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub recycled: u64,
    pub in_flight: u64,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    recycled: AtomicU64,
    in_flight: AtomicU64,
}

struct QueuedTask {
    spec: TaskSpec,
    reply: oneshot::Sender<TaskOutcome>,
}

type SharedQueue = Arc<AsyncMutex<mpsc::Receiver<QueuedTask>>>;

enum WorkerExit {
    Recycled,
    QueueClosed,
}

/// A pool of workers bound to one phase queue.
///
/// Workers share nothing but the queue, pull exactly one task at a time
/// (no prefetch), and are replaced after `max_tasks_before_recycle` tasks
/// to bound accumulated in-process state.
pub struct WorkerPool {
    phase: Phase,
    tx: Mutex<Option<mpsc::Sender<QueuedTask>>>,
    counters: Arc<Counters>,
    slots: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start the pool's workers.
    pub fn start(phase: Phase, config: PoolConfig, executor: Arc<dyn TaskExecutor>) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let queue: SharedQueue = Arc::new(AsyncMutex::new(rx));
        let counters = Arc::new(Counters::default());
        let max_tasks = config.max_tasks_before_recycle.max(1);

        let slots = (0..config.concurrency.max(1))
            .map(|slot| {
                let queue = Arc::clone(&queue);
                let executor = Arc::clone(&executor);
                let counters = Arc::clone(&counters);
                tokio::spawn(run_slot(phase, slot, max_tasks, queue, executor, counters))
            })
            .collect();

        info!(
            phase = %phase,
            queue = %phase.queue_name(),
            concurrency = config.concurrency.max(1),
            "worker_pool_started"
        );

        Self {
            phase,
            tx: Mutex::new(Some(tx)),
            counters,
            slots,
        }
    }

    /// Enqueue a task. Non-blocking up to queue capacity; at-most-once per
    /// submission.
    pub async fn submit(&self, spec: TaskSpec) -> SchedulerResult<TaskHandle> {
        let tx = {
            let guard = self.tx.lock().expect("pool sender lock poisoned");
            guard
                .as_ref()
                .cloned()
                .ok_or(SchedulerError::PoolClosed(self.phase))?
        };

        let task_id = spec.id.clone();
        let (reply, rx) = oneshot::channel();
        tx.send(QueuedTask { spec, reply })
            .await
            .map_err(|_| SchedulerError::PoolClosed(self.phase))?;

        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        debug!(phase = %self.phase, task_id = %task_id, "task_submitted");
        Ok(TaskHandle { task_id, rx })
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            recycled: self.counters.recycled.load(Ordering::Relaxed),
            in_flight: self.counters.in_flight.load(Ordering::Relaxed),
        }
    }

    /// Close the queue; queued and in-flight tasks still finish.
    pub fn close(&self) {
        self.tx.lock().expect("pool sender lock poisoned").take();
    }

    /// Close the queue and wait for all workers to drain and exit.
    pub async fn shutdown(self) {
        self.close();
        for slot in self.slots {
            let _ = slot.await;
        }
        info!(phase = %self.phase, "worker_pool_stopped");
    }
}

/// One worker slot: runs worker generations back to back, replacing each
/// recycled worker with a fresh one until the queue closes.
async fn run_slot(
    phase: Phase,
    slot: usize,
    max_tasks: usize,
    queue: SharedQueue,
    executor: Arc<dyn TaskExecutor>,
    counters: Arc<Counters>,
) {
    let mut generation: u64 = 0;
    loop {
        match worker_loop(phase, max_tasks, &queue, &executor, &counters).await {
            WorkerExit::Recycled => {
                counters.recycled.fetch_add(1, Ordering::Relaxed);
                debug!(phase = %phase, slot, generation, "worker_recycled");
                generation += 1;
            }
            WorkerExit::QueueClosed => break,
        }
    }
}

/// One worker generation: pull one task at a time until recycled.
async fn worker_loop(
    phase: Phase,
    max_tasks: usize,
    queue: &SharedQueue,
    executor: &Arc<dyn TaskExecutor>,
    counters: &Arc<Counters>,
) -> WorkerExit {
    let mut processed = 0usize;
    loop {
        // Holding the lock only while receiving keeps fetch strictly
        // one-at-a-time per worker.
        let next = { queue.lock().await.recv().await };
        let Some(QueuedTask { spec, reply }) = next else {
            return WorkerExit::QueueClosed;
        };

        counters.in_flight.fetch_add(1, Ordering::Relaxed);
        let task_id = spec.id.clone();
        let outcome = run_task(spec, executor).await;
        counters.in_flight.fetch_sub(1, Ordering::Relaxed);

        match &outcome {
            Ok(_) => {
                counters.completed.fetch_add(1, Ordering::Relaxed);
                debug!(phase = %phase, task_id = %task_id, "task_completed");
            }
            Err(failure) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(phase = %phase, task_id = %task_id, error = %failure, "task_failed");
            }
        }
        // The caller may have dropped the handle; the outcome is then lost
        // by design (no retry, no checkpoint).
        let _ = reply.send(outcome);

        processed += 1;
        if processed >= max_tasks {
            return WorkerExit::Recycled;
        }
    }
}

/// Run one task under its time limits.
///
/// The soft limit trips the cooperative cancellation signal; the hard
/// limit drops the in-flight future, losing its state.
async fn run_task(spec: TaskSpec, executor: &Arc<dyn TaskExecutor>) -> TaskOutcome {
    let (trigger, cancel) = soft_cancel_pair();
    let soft = spec.soft_time_limit;
    let hard = spec.hard_time_limit;

    let soft_timer = tokio::spawn(async move {
        tokio::time::sleep(soft).await;
        trigger.trigger();
    });

    let result = tokio::time::timeout(hard, executor.execute(spec, cancel)).await;
    soft_timer.abort();

    match result {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(TaskFailure::Failed(err.to_string())),
        Err(_) => Err(TaskFailure::HardTimeout(hard)),
    }
}
