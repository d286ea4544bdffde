//! End-to-end decision runs across the whole stack.

use std::sync::Arc;

use latentflow_audit::{verify_chain, AuditSink, JsonlAuditSink, MemoryAuditSink};
use latentflow_executor::{ToolExecutor, ToolRegistry};
use latentflow_guard::GuardRule;
use latentflow_meta::FailureKind;
use latentflow_runtime::{CostCounter, Engine, MetaRuntime, RuntimeConfig};
use latentflow_state::{LatentState, StateStore};
use latentflow_types::{Block, DecisionStatus, IntentFrame};
use serde_json::json;

fn bank() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry
        .register_fn("check_user", |p| Ok(json!({"user": p.get("user"), "exists": true})))
        .register_fn("check_balance", |_| Ok(json!({"balance": 10_000})))
        .register_fn("create_transfer", |p| Ok(json!({"transfer_id": "T-1", "amount": p.get("amount")})))
        .register_fn("submit_transfer", |_| Ok(json!({"status": "submitted"})))
        .register_fn("submit_withdraw", |_| Ok(json!({"status": "submitted"})))
        .register_fn("load_order", |p| Ok(json!({"order_id": p.get("order_id")})))
        .register_fn("cancel_order", |_| Ok(json!({"status": "cancelled"})));
    registry
}

fn runtime(config: &RuntimeConfig, audit: Option<Arc<dyn AuditSink>>) -> MetaRuntime {
    let engine = Arc::new(config.build_engine(audit.clone()));
    let mut executor = ToolExecutor::new(Arc::new(bank()));
    if let Some(audit) = audit {
        executor = executor.with_audit(audit);
    }
    MetaRuntime::new(engine, config.build_planner(), executor)
}

fn transfer(to: &str, amount: u64) -> Block {
    IntentFrame::new("transfer")
        .with_slot("to", to)
        .with_slot("amount", amount)
        .to_block()
        .unwrap()
}

#[test]
fn transfer_runs_cheapest_plan_and_compresses() {
    let audit = Arc::new(MemoryAuditSink::new());
    let mut rt = runtime(&RuntimeConfig::default(), Some(audit.clone()));
    let mut state = LatentState::default();
    let mut cost = CostCounter::new();

    let result = rt.run(&mut state, &mut cost, &transfer("Bob", 100));

    assert_eq!(result.status, DecisionStatus::Ok, "{:?}", result.error);
    assert_eq!(result.executed, vec!["check_user", "create_transfer", "submit_transfer"]);
    assert_eq!(result.tool_results[1]["result"]["amount"], json!(100));
    assert_eq!(state.counter(), 4);
    assert_eq!(state.compress_count(), 1);
    assert_eq!(cost.operations, 4);

    let events = audit.events();
    assert!(events.iter().any(|e| e == "compress"));
    assert_eq!(events.iter().filter(|e| *e == "tool_exec").count(), 3);
    assert_eq!(events.iter().filter(|e| *e == "consume_ok").count(), 4);
    assert_eq!(events.last().map(String::as_str), Some("decision"));
}

#[test]
fn withdraw_needs_a_submit_step() {
    let mut rt = runtime(&RuntimeConfig::default(), None);
    let mut state = LatentState::default();
    let frame = IntentFrame::new("withdraw").with_slot("amount", 50);

    let result = rt.run(&mut state, &mut CostCounter::new(), &frame.to_block().unwrap());

    assert!(result.is_ok());
    assert_eq!(result.executed, vec!["check_balance", "submit_withdraw"]);
}

#[test]
fn blocked_target_is_denied_before_any_tool_runs() {
    let config = RuntimeConfig::from_toml_str("[policy]\nblocked_targets = [\"Mallory\"]").unwrap();
    let mut rt = runtime(&config, None);
    let mut state = LatentState::default();

    let result = rt.run(&mut state, &mut CostCounter::new(), &transfer("Mallory", 5_000));

    assert_eq!(result.status, DecisionStatus::Deny);
    assert!(result.error.unwrap().contains("POLICY_BLOCKED_TARGET"));
    assert!(result.executed.is_empty());
}

#[test]
fn guard_rejection_mid_plan_rolls_back_feedback() {
    let config = RuntimeConfig {
        guard: latentflow_runtime::GuardConfig {
            rules: vec![GuardRule::max_steps(2)],
        },
        ..RuntimeConfig::default()
    };
    let mut rt = runtime(&config, None);
    let mut state = LatentState::default();
    let frame = IntentFrame::new("cancel_order").with_slot("order_id", "A7");

    let result = rt.run(&mut state, &mut CostCounter::new(), &frame.to_block().unwrap());

    assert_eq!(result.status, DecisionStatus::Fail);
    assert_eq!(result.failure_kind, Some(FailureKind::StateGuardViolation));
    assert!(result.error.as_deref().unwrap_or_default().contains("MAX_STEPS"));
    // Intent and the first result committed; the second was rolled back.
    assert_eq!(state.counter(), 2);
    let last = result.trace.exec.last().unwrap();
    assert_eq!(last.action, "cancel_order");
    assert!(last.ok);
    assert!(!last.consumed);
    assert!(!result.trace.fatal);
    assert_eq!(rt.causal().len(), 1);
}

#[test]
fn duplicate_intent_block_is_seen_but_not_counted() {
    let engine = Engine::new().with_invariants(true);
    let mut state = LatentState::default();
    let mut cost = CostCounter::new();
    let block = transfer("Bob", 1);

    let first = engine.consume(&mut state, block.clone(), &mut cost).unwrap();
    let second = engine.consume(&mut state, block, &mut cost).unwrap();

    assert!(!first.outcome.is_dedup());
    assert!(second.outcome.is_dedup());
    assert_eq!(second.delta.delta_steps, 0);
    assert_eq!(second.delta.delta_seen, 1);
    assert_eq!(state.counter(), 1);
    assert_eq!(state.seen_events(), 2);
    assert_eq!(cost.operations, 2);
}

#[test]
fn audit_log_of_a_run_verifies() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logs").join("audit.jsonl");
    let config = RuntimeConfig {
        audit: latentflow_runtime::AuditConfig {
            path: Some(path.clone()),
            also_stdout: false,
        },
        ..RuntimeConfig::default()
    };
    let sink = config.open_audit_sink().unwrap();
    let mut rt = runtime(&config, sink);
    let mut state = LatentState::default();
    let mut cost = CostCounter::new();

    rt.run(&mut state, &mut cost, &transfer("Bob", 100));
    rt.run(&mut state, &mut cost, &transfer("Bob", 9_999));

    let records = JsonlAuditSink::open(&path, false).unwrap().read_all().unwrap();
    let report = verify_chain(&path).unwrap();
    assert!(report.valid, "{:?}", report.error_message);
    assert_eq!(report.total_records, records.len());
    assert_eq!(records.iter().filter(|r| r.event == "decision").count(), 2);
}

#[test]
fn sessions_run_in_parallel_without_sharing_state() {
    let config = RuntimeConfig::default();
    let store = StateStore::new(config.state.clone());
    let engine = Arc::new(config.build_engine(None));
    let registry = Arc::new(bank());

    std::thread::scope(|scope| {
        for (session, runs) in [("alice", 1usize), ("bob", 3)] {
            let store = &store;
            let engine = engine.clone();
            let registry = registry.clone();
            let planner = config.build_planner();
            scope.spawn(move || {
                let mut rt = MetaRuntime::new(engine, planner, ToolExecutor::new(registry));
                let mut state = store.get(session);
                let mut cost = CostCounter::new();
                for i in 0..runs {
                    let frame = IntentFrame::new("cancel_order").with_slot("order_id", format!("{session}-{i}"));
                    assert!(rt.run(&mut state, &mut cost, &frame.to_block().unwrap()).is_ok());
                }
                store.commit(session, state);
            });
        }
    });

    assert_eq!(store.get("alice").counter(), 3);
    assert_eq!(store.get("bob").counter(), 9);
}
