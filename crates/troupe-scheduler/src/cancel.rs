//! Cooperative cancellation for soft time limits.

use tokio::sync::watch;

/// Signal handed to executors so they can observe the soft time limit.
///
/// The signal is advisory: an executor that sees it should wind down
/// gracefully and still report a result. Ignoring it means running into
/// the hard limit, which is fatal to the task.
#[derive(Debug, Clone)]
pub struct SoftCancel {
    rx: watch::Receiver<bool>,
}

impl SoftCancel {
    /// Check whether the soft limit has elapsed.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the soft limit elapses.
    ///
    /// Resolves immediately if it already has. Also resolves if the
    /// trigger side went away (the task finished first).
    pub async fn cancelled(&mut self) {
        while !*self.rx.borrow() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Trigger side of the soft-cancel pair, held by the worker.
#[derive(Debug)]
pub(crate) struct SoftCancelTrigger {
    tx: watch::Sender<bool>,
}

impl SoftCancelTrigger {
    pub(crate) fn trigger(&self) {
        let _ = self.tx.send(true);
    }
}

pub(crate) fn soft_cancel_pair() -> (SoftCancelTrigger, SoftCancel) {
    let (tx, rx) = watch::channel(false);
    (SoftCancelTrigger { tx }, SoftCancel { rx })
}
