//! Agent role tags used as registry and subscription keys.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Enumerated role tag identifying an agent kind.
///
/// Roles are the addressing unit of the message bus: the registry,
/// subscription table, and usage breakdowns are all keyed by role.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    RequirementsAnalyst,
    Research,
    Architect,
    ModuleDesigner,
    Planner,
    Coder,
    CodeGenerator,
    Tester,
    IntegrationTester,
    Reviewer,
    SecurityAuditor,
    Debugger,
    Executor,
    Monitor,
}

impl AgentRole {
    /// Get the role as a snake_case string slice.
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::RequirementsAnalyst => "requirements_analyst",
            AgentRole::Research => "research",
            AgentRole::Architect => "architect",
            AgentRole::ModuleDesigner => "module_designer",
            AgentRole::Planner => "planner",
            AgentRole::Coder => "coder",
            AgentRole::CodeGenerator => "code_generator",
            AgentRole::Tester => "tester",
            AgentRole::IntegrationTester => "integration_tester",
            AgentRole::Reviewer => "reviewer",
            AgentRole::SecurityAuditor => "security_auditor",
            AgentRole::Debugger => "debugger",
            AgentRole::Executor => "executor",
            AgentRole::Monitor => "monitor",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
