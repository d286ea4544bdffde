use serde::{Deserialize, Serialize};

use crate::latent::LatentState;

/// Difference between the state before and after one transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDelta {
    pub delta_steps: u64,
    pub delta_seen: u64,
    pub compressed: bool,
}

impl StateDelta {
    pub fn between(before: &LatentState, after: &LatentState) -> Self {
        Self {
            delta_steps: after.counter().saturating_sub(before.counter()),
            delta_seen: after.seen_events().saturating_sub(before.seen_events()),
            compressed: after.compress_count() != before.compress_count(),
        }
    }
}
