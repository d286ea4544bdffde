use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse failure category used for statistics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ConstraintViolation,
    StateGuardViolation,
    ToolError,
    UnknownFailure,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::ConstraintViolation => "constraint_violation",
            FailureKind::StateGuardViolation => "state_guard_violation",
            FailureKind::ToolError => "tool_error",
            FailureKind::UnknownFailure => "unknown_failure",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reflection {
    pub kind: FailureKind,
    pub message: String,
    /// Where in the decision loop the failure surfaced
    pub stage: String,
}

/// Classifies failures by their rendered message.
#[derive(Clone, Copy, Debug, Default)]
pub struct Reflector;

impl Reflector {
    pub fn classify(message: &str) -> FailureKind {
        if message.contains("POLICY_") || message.contains("CONSTRAINT_") {
            FailureKind::ConstraintViolation
        } else if message.contains("MAX_") || message.contains("DENY_") || message.contains("State overflow") {
            FailureKind::StateGuardViolation
        } else if message.contains("Tool not found") || message.to_lowercase().contains("tool") {
            FailureKind::ToolError
        } else {
            FailureKind::UnknownFailure
        }
    }

    pub fn classify_failure(&self, message: impl Into<String>, stage: impl Into<String>) -> Reflection {
        let message = message.into();
        Reflection {
            kind: Self::classify(&message),
            message,
            stage: stage.into(),
        }
    }
}
