//! A rejected transaction leaves no trace in the state.

use std::sync::Arc;

use latentflow_audit::MemoryAuditSink;
use latentflow_guard::{GuardRule, StateGuard};
use latentflow_runtime::{CostCounter, Engine};
use latentflow_state::LatentState;
use latentflow_types::Block;
use proptest::prelude::*;
use serde_json::json;

fn arb_block() -> impl Strategy<Value = Block> {
    (prop_oneof![Just("event"), Just("intent"), Just("forbidden")], 0u8..10)
        .prop_map(|(block_type, n)| Block::new(json!({ "n": n }), block_type))
}

proptest! {
    #[test]
    fn rejected_updates_restore_the_snapshot(
        blocks in prop::collection::vec(arb_block(), 1..60),
        max_steps in 1u64..20,
        max_events in 0u64..8,
        max_history in 1usize..5,
    ) {
        let audit = Arc::new(MemoryAuditSink::new());
        let engine = Engine::new()
            .with_guard(StateGuard::new(vec![
                GuardRule::max_steps(max_steps),
                GuardRule::max_event_count(max_events, "event"),
                GuardRule::deny_block_types(["forbidden"]),
            ]))
            .with_invariants(true)
            .with_audit(audit.clone());
        let mut state = LatentState::with_limits(max_history, 16);
        let mut cost = CostCounter::new();

        for (i, block) in blocks.into_iter().enumerate() {
            let before = state.clone();
            let is_forbidden = block.block_type() == "forbidden";
            match engine.consume(&mut state, block, &mut cost) {
                Ok(_) => prop_assert!(state.counter() <= max_steps),
                Err(err) => {
                    prop_assert!(!err.is_fatal());
                    prop_assert_eq!(&state, &before);
                    let events = audit.events();
                    prop_assert_eq!(events.last().map(String::as_str), Some("consume_violation"));
                }
            }
            prop_assert_eq!(cost.operations, i as u64 + 1);
            if is_forbidden {
                prop_assert!(state.short_history().all(|b| b.block_type() != "forbidden"));
            }
        }
    }
}
