use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of one decision run, the only user-visible result channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionStatus {
    /// Plan executed and post-checks passed.
    Ok,
    /// Policy-level refusal.
    Deny,
    /// Missing or ambiguous input.
    NeedClarification,
    /// Execution or post-check failure.
    Fail,
}

impl DecisionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionStatus::Ok => "OK",
            DecisionStatus::Deny => "DENY",
            DecisionStatus::NeedClarification => "NEED_CLARIFICATION",
            DecisionStatus::Fail => "FAIL",
        }
    }
}

impl fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
