//! # Troupe Core
//!
//! Core traits and types for the troupe agent pipeline.
//! This crate provides the shared vocabulary the coordination crates build on:
//! agent roles, typed messages, the agent capability contract, the LLM call
//! boundary, and usage accounting.

pub mod agent;
pub mod error;
pub mod llm;
pub mod message;
pub mod pricing;
pub mod role;
pub mod usage;

pub use agent::Agent;
pub use error::{AgentError, AgentResult};
pub use llm::{ChatMessage, LlmClient, LlmResponse, TokenUsage};
pub use message::{Message, MessageId, MessageIdError, MessageKind, Payload};
pub use role::AgentRole;
pub use usage::{UsageBucket, UsageRecord, UsageScope, UsageSummary, UsageTracker};
