//! Read-only queries that see both folded and not-yet-folded blocks.

use serde_json::Value;

use crate::latent::LatentState;

/// Count of blocks of `block_type`: compressed count plus matching entries
/// still sitting in short history.
pub fn effective_type_count(state: &LatentState, block_type: &str) -> u64 {
    let core = state
        .compressed_core()
        .get(block_type)
        .map(|c| c.count)
        .unwrap_or(0);
    let pending = state
        .short_history()
        .filter(|b| b.block_type() == block_type)
        .count() as u64;
    core + pending
}

/// Most recent content of `block_type`, preferring unfolded history.
pub fn effective_last<'a>(state: &'a LatentState, block_type: &str) -> Option<&'a Value> {
    state
        .short_history()
        .rev()
        .find(|b| b.block_type() == block_type)
        .map(|b| b.content())
        .or_else(|| state.compressed_core().get(block_type).map(|c| &c.last))
}

#[cfg(test)]
mod tests {
    use super::*;
    use latentflow_types::Block;
    use serde_json::json;

    #[test]
    fn count_spans_core_and_history() {
        let mut state = LatentState::with_limits(3, 16);
        for n in 0..4 {
            state.update(Block::event(json!(n)));
        }
        assert_eq!(state.short_history_len(), 1);
        assert_eq!(effective_type_count(&state, "event"), 4);
        assert_eq!(effective_type_count(&state, "intent"), 0);
    }

    #[test]
    fn last_prefers_unfolded_entry() {
        let mut state = LatentState::with_limits(3, 16);
        for n in 0..4 {
            state.update(Block::event(json!(n)));
        }
        assert_eq!(effective_last(&state, "event"), Some(&json!(3)));
    }

    #[test]
    fn last_falls_back_to_core() {
        let mut state = LatentState::with_limits(3, 16);
        for n in 0..3 {
            state.update(Block::event(json!(n)));
        }
        assert_eq!(effective_last(&state, "event"), Some(&json!(2)));
        assert_eq!(effective_last(&state, "missing"), None);
    }
}
