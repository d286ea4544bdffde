use serde::{Deserialize, Serialize};

/// Sizing knobs for a session state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateConfig {
    /// History length that triggers compression (default: 3)
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    /// Number of recent block ids remembered for dedup (default: 1024)
    #[serde(default = "default_dedup_capacity")]
    pub dedup_capacity: usize,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            dedup_capacity: default_dedup_capacity(),
        }
    }
}

fn default_max_history() -> usize {
    3
}

fn default_dedup_capacity() -> usize {
    1024
}
