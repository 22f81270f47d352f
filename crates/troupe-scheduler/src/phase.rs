//! Logical pipeline phases and the task naming convention.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SchedulerError;

/// A logical pipeline phase, bound to one isolated execution queue.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Discovery,
    Design,
    Implementation,
    Qa,
    Validation,
    Monitoring,
}

impl Phase {
    /// All phases, in pipeline order.
    pub fn all() -> [Phase; 6] {
        [
            Phase::Discovery,
            Phase::Design,
            Phase::Implementation,
            Phase::Qa,
            Phase::Validation,
            Phase::Monitoring,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Discovery => "discovery",
            Phase::Design => "design",
            Phase::Implementation => "implementation",
            Phase::Qa => "qa",
            Phase::Validation => "validation",
            Phase::Monitoring => "monitoring",
        }
    }

    /// Name of the dedicated queue serving this phase.
    pub fn queue_name(&self) -> String {
        format!("troupe.{}", self.as_str())
    }
}

impl FromStr for Phase {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discovery" => Ok(Phase::Discovery),
            "design" => Ok(Phase::Design),
            "implementation" => Ok(Phase::Implementation),
            "qa" => Ok(Phase::Qa),
            "validation" => Ok(Phase::Validation),
            "monitoring" => Ok(Phase::Monitoring),
            other => Err(SchedulerError::UnknownPhase(other.to_string())),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A task name of the form `"<phase>.<operation>"`.
///
/// The phase prefix decides which queue the task routes to
/// (`"<phase>.*"` maps to the phase's dedicated queue).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskName {
    phase: Phase,
    operation: String,
}

impl TaskName {
    /// Build a task name from its parts.
    pub fn new(phase: Phase, operation: impl Into<String>) -> Self {
        Self {
            phase,
            operation: operation.into(),
        }
    }

    /// Parse `"<phase>.<operation>"`, rejecting names without an operation
    /// or with an unknown phase prefix.
    pub fn parse(name: &str) -> Result<Self, SchedulerError> {
        let (prefix, operation) = name.split_once('.').ok_or_else(|| {
            SchedulerError::InvalidTaskName {
                name: name.to_string(),
                reason: "expected '<phase>.<operation>'".to_string(),
            }
        })?;
        if operation.is_empty() {
            return Err(SchedulerError::InvalidTaskName {
                name: name.to_string(),
                reason: "operation is empty".to_string(),
            });
        }
        let phase = prefix.parse()?;
        Ok(Self {
            phase,
            operation: operation.to_string(),
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.phase, self.operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_phase_and_operation() {
        let name = TaskName::parse("design.draw_schema").unwrap();
        assert_eq!(name.phase(), Phase::Design);
        assert_eq!(name.operation(), "draw_schema");
        assert_eq!(name.to_string(), "design.draw_schema");
    }

    #[test]
    fn parse_keeps_dotted_operations_whole() {
        // Only the first dot separates the phase.
        let name = TaskName::parse("qa.run.integration").unwrap();
        assert_eq!(name.phase(), Phase::Qa);
        assert_eq!(name.operation(), "run.integration");
    }

    #[test]
    fn parse_rejects_missing_operation() {
        assert!(matches!(
            TaskName::parse("discovery"),
            Err(SchedulerError::InvalidTaskName { .. })
        ));
        assert!(matches!(
            TaskName::parse("discovery."),
            Err(SchedulerError::InvalidTaskName { .. })
        ));
    }

    #[test]
    fn parse_rejects_unknown_phase() {
        assert!(matches!(
            TaskName::parse("shipping.pack"),
            Err(SchedulerError::UnknownPhase(_))
        ));
    }

    #[test]
    fn queue_names_are_phase_scoped() {
        assert_eq!(Phase::Qa.queue_name(), "troupe.qa");
        assert_eq!(Phase::all().len(), 6);
    }
}
