//! # Troupe Bus
//!
//! Asynchronous message bus for agent-to-agent communication.
//!
//! The bus routes typed messages between registered agents by direct
//! address or capability-based broadcast, with a single cooperative
//! dispatch loop evaluating routing decisions in strict enqueue order.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use troupe_bus::MessageBus;
//! use troupe_core::{Agent, AgentRole, MessageKind};
//!
//! async fn example(planner: Arc<dyn Agent>) -> Result<(), Box<dyn std::error::Error>> {
//!     let bus = MessageBus::new(64);
//!     bus.register(AgentRole::Planner, planner).await;
//!     bus.subscribe(AgentRole::Planner, &[MessageKind::Notification]).await?;
//!     bus.spawn_dispatcher()?;
//!
//!     // Broadcast reaches every subscriber of the kind, except the sender.
//!     bus.send(
//!         AgentRole::Coder,
//!         "build finished",
//!         None,
//!         MessageKind::Notification,
//!         None,
//!     )
//!     .await?;
//!     Ok(())
//! }
//! ```

pub mod bus;
pub mod error;
pub mod history;

pub use bus::{MessageBus, UnroutableEvent};
pub use error::{BusError, BusResult};
