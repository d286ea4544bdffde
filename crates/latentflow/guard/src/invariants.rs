use latentflow_state::LatentState;
use thiserror::Error;

/// Engineering-correctness violations. Any of these indicates a defect.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error(
        "INV_EVENT_COUNT_MISMATCH core_total={core_total} short={short} counter={counter}"
    )]
    CountMismatch {
        core_total: u64,
        short: u64,
        counter: u64,
    },

    #[error("INV_SEEN_MISMATCH counter={counter} dedup_hits={dedup_hits} seen={seen}")]
    SeenMismatch {
        counter: u64,
        dedup_hits: u64,
        seen: u64,
    },

    #[error("INV_DEDUP_OVER_CAPACITY size={size} capacity={capacity}")]
    DedupOverCapacity { size: usize, capacity: usize },
}

impl InvariantViolation {
    pub fn code(&self) -> &'static str {
        match self {
            InvariantViolation::CountMismatch { .. } => "INV_EVENT_COUNT_MISMATCH",
            InvariantViolation::SeenMismatch { .. } => "INV_SEEN_MISMATCH",
            InvariantViolation::DedupOverCapacity { .. } => "INV_DEDUP_OVER_CAPACITY",
        }
    }
}

/// Fixed correctness checks run after every update.
#[derive(Clone, Copy, Debug, Default)]
pub struct Invariants;

impl Invariants {
    pub fn check(state: &LatentState) -> Result<(), InvariantViolation> {
        let core_total: u64 = state.compressed_core().values().map(|c| c.count).sum();
        let short = state.short_history_len() as u64;
        if core_total + short != state.counter() {
            return Err(InvariantViolation::CountMismatch {
                core_total,
                short,
                counter: state.counter(),
            });
        }

        if state.counter() + state.dedup_hits() != state.seen_events() {
            return Err(InvariantViolation::SeenMismatch {
                counter: state.counter(),
                dedup_hits: state.dedup_hits(),
                seen: state.seen_events(),
            });
        }

        let dedup = state.dedup_index();
        if dedup.len() > dedup.capacity() {
            return Err(InvariantViolation::DedupOverCapacity {
                size: dedup.len(),
                capacity: dedup.capacity(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use latentflow_state::{DedupIndex, StateParts};
    use latentflow_types::Block;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn parts() -> StateParts {
        StateParts {
            short_history: vec![Block::event(json!(1))],
            compressed_core: BTreeMap::new(),
            counter: 1,
            seen_events: 1,
            dedup_hits: 0,
            compress_count: 0,
            dedup: DedupIndex::new(4),
            max_history: 3,
        }
    }

    #[test]
    fn reachable_states_pass() {
        let mut state = LatentState::with_limits(3, 2);
        for n in [1, 2, 1, 3, 4, 4, 5] {
            state.update(Block::event(json!(n)));
            Invariants::check(&state).unwrap();
        }
    }

    #[test]
    fn count_mismatch_is_detected() {
        let mut p = parts();
        p.counter = 2;
        p.seen_events = 2;
        let err = Invariants::check(&LatentState::from_parts(p)).unwrap_err();
        assert_eq!(err.code(), "INV_EVENT_COUNT_MISMATCH");
    }

    #[test]
    fn seen_mismatch_is_detected() {
        let mut p = parts();
        p.seen_events = 5;
        let err = Invariants::check(&LatentState::from_parts(p)).unwrap_err();
        assert_eq!(err.code(), "INV_SEEN_MISMATCH");
    }

    #[test]
    fn dedup_bound_holds_under_churn() {
        let mut state = LatentState::with_limits(3, 2);
        for n in 0..50 {
            state.update(Block::event(json!(n % 7)));
        }
        Invariants::check(&state).unwrap();
        assert!(state.dedup_index().len() <= 2);
    }
}
