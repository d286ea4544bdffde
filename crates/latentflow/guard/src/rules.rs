use std::collections::BTreeSet;

use latentflow_state::{effective_type_count, LatentState};
use latentflow_types::Violation;
use serde::{Deserialize, Serialize};

/// Built-in guard rules.
///
/// Configured from TOML as `{ kind = "max_steps", limit = 2000 }` and so on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GuardRule {
    /// Fails when accepted updates exceed `limit`.
    MaxSteps { limit: u64 },
    /// Fails when the compressed core holds more than `limit` block types.
    MaxCoreKeys { limit: usize },
    /// Fails when short history contains a block of a denied type.
    DenyBlockTypes { types: BTreeSet<String> },
    /// Fails when the effective count of `block_type` exceeds `limit`.
    MaxEventCount {
        limit: u64,
        #[serde(default = "default_event_type")]
        block_type: String,
    },
}

fn default_event_type() -> String {
    "event".to_string()
}

impl GuardRule {
    pub fn max_steps(limit: u64) -> Self {
        GuardRule::MaxSteps { limit }
    }

    pub fn max_core_keys(limit: usize) -> Self {
        GuardRule::MaxCoreKeys { limit }
    }

    pub fn deny_block_types<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        GuardRule::DenyBlockTypes {
            types: types.into_iter().map(Into::into).collect(),
        }
    }

    pub fn max_event_count(limit: u64, block_type: impl Into<String>) -> Self {
        GuardRule::MaxEventCount {
            limit,
            block_type: block_type.into(),
        }
    }

    /// Stable display name used in traces, e.g. `max_steps(2000)`.
    pub fn name(&self) -> String {
        match self {
            GuardRule::MaxSteps { limit } => format!("max_steps({limit})"),
            GuardRule::MaxCoreKeys { limit } => format!("max_core_keys({limit})"),
            GuardRule::DenyBlockTypes { types } => {
                let joined: Vec<&str> = types.iter().map(String::as_str).collect();
                format!("deny_block_types({})", joined.join(","))
            }
            GuardRule::MaxEventCount { limit, block_type } => {
                format!("max_event_count({block_type},{limit})")
            }
        }
    }

    /// Evaluate against a state; `Some` on violation.
    pub fn evaluate(&self, state: &LatentState) -> Option<Violation> {
        match self {
            GuardRule::MaxSteps { limit } => {
                let steps = state.counter();
                (steps > *limit).then(|| {
                    Violation::new(
                        "MAX_STEPS",
                        format!("state steps exceeded limit: {steps} > {limit}"),
                    )
                    .with_meta("steps", steps)
                    .with_meta("limit", *limit)
                })
            }
            GuardRule::MaxCoreKeys { limit } => {
                let keys = state.compressed_core().len();
                (keys > *limit).then(|| {
                    Violation::new(
                        "CORE_KEYS_OVERFLOW",
                        format!("compressed_core keys overflow: {keys} > {limit}"),
                    )
                    .with_meta("keys", keys)
                    .with_meta("limit", *limit)
                })
            }
            GuardRule::DenyBlockTypes { types } => state
                .short_history()
                .find(|b| types.contains(b.block_type()))
                .map(|b| {
                    let denied: Vec<&str> = types.iter().map(String::as_str).collect();
                    Violation::new(
                        "DENY_BLOCK_TYPE",
                        format!("denied block_type detected: {}", b.block_type()),
                    )
                    .with_meta("block_type", b.block_type())
                    .with_meta("deny", denied)
                }),
            GuardRule::MaxEventCount { limit, block_type } => {
                let count = effective_type_count(state, block_type);
                (count > *limit).then(|| {
                    Violation::new(
                        "MAX_EVENT_COUNT",
                        format!("{block_type} count overflow: {count} > {limit}"),
                    )
                    .with_meta("event_type", block_type.as_str())
                    .with_meta("count", count)
                    .with_meta("limit", *limit)
                })
            }
        }
    }
}
