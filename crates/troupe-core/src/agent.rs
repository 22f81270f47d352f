//! The agent capability contract.
//!
//! The coordination layer depends only on this shape - an asynchronous task
//! processor plus a message handler - never on a concrete agent
//! implementation. Prompt construction, provider calls, and output
//! extraction all live behind it.

use async_trait::async_trait;

use crate::error::AgentResult;
use crate::message::Message;
use crate::role::AgentRole;

/// An autonomous unit implementing one capability.
///
/// Agents are invoked by the orchestrator or scheduler via
/// [`process_task`](Agent::process_task) and receive bus traffic through
/// [`receive_message`](Agent::receive_message).
#[async_trait]
pub trait Agent: Send + Sync {
    /// The role this agent is registered under.
    fn role(&self) -> AgentRole;

    /// Process one task payload and produce a result.
    ///
    /// # Errors
    ///
    /// Returns `AgentError` if the task cannot be completed. The caller
    /// decides whether to resubmit; the core never retries.
    async fn process_task(&self, payload: serde_json::Value) -> AgentResult<serde_json::Value>;

    /// Handle a message delivered by the bus.
    ///
    /// Failures here are isolated per recipient by the dispatch loop; they
    /// never reach the sender. The default implementation ignores the
    /// message.
    async fn receive_message(&self, _message: Message) -> AgentResult<()> {
        Ok(())
    }
}
