//! Error types for bus operations.

use thiserror::Error;
use troupe_core::AgentRole;

/// Result type for bus operations.
pub type BusResult<T> = Result<T, BusError>;

/// Errors that can occur during bus operations.
#[derive(Error, Debug)]
pub enum BusError {
    /// The ingress queue is closed; the bus has been shut down
    #[error("bus is closed")]
    Closed,

    /// The dispatch loop was already started for this bus instance
    #[error("dispatcher already running")]
    DispatcherAlreadyRunning,

    /// Operation referenced a role with no registered agent
    #[error("no agent registered for role '{0}'")]
    UnknownAgent(AgentRole),
}
