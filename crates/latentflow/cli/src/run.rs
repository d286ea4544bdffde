//! Batch execution of intent frames across sessions.

use std::sync::Arc;

use anyhow::{Context, Result};
use latentflow_executor::{ToolExecutor, ToolRegistry};
use latentflow_runtime::{CostCounter, DecisionResult, MetaRuntime, RuntimeConfig};
use latentflow_state::StateStore;
use serde::Serialize;
use tracing::{debug, info};

use crate::frames::SessionFrames;

/// One output line: the decision plus where its frame came from.
#[derive(Debug, Clone, Serialize)]
pub struct SessionDecision {
    pub session: String,
    pub line: usize,
    #[serde(flatten)]
    pub result: DecisionResult,
}

/// Run every session on its own blocking task. Frames within a session run
/// in order against that session's state; results come back sorted by input
/// line.
pub async fn run_sessions(
    config: &RuntimeConfig,
    registry: ToolRegistry,
    sessions: Vec<SessionFrames>,
) -> Result<Vec<SessionDecision>> {
    let audit = config.open_audit_sink().context("failed to open audit log")?;
    let engine = Arc::new(config.build_engine(audit.clone()));
    let mut executor = ToolExecutor::new(Arc::new(registry));
    if let Some(audit) = audit {
        executor = executor.with_audit(audit);
    }
    let store = Arc::new(config.state_store());

    let mut handles = Vec::with_capacity(sessions.len());
    for batch in sessions {
        let runtime = MetaRuntime::new(engine.clone(), config.build_planner(), executor.clone());
        let store = store.clone();
        handles.push(tokio::task::spawn_blocking(move || run_session(runtime, &store, batch)));
    }

    let mut decisions = Vec::new();
    for handle in handles {
        decisions.extend(handle.await.context("session task panicked")??);
    }
    decisions.sort_by_key(|d| d.line);

    info!(decisions = decisions.len(), sessions = store.len(), "Batch complete");
    Ok(decisions)
}

fn run_session(mut runtime: MetaRuntime, store: &StateStore, batch: SessionFrames) -> Result<Vec<SessionDecision>> {
    let mut state = store.get(&batch.session);
    let mut cost = CostCounter::new();
    let mut decisions = Vec::with_capacity(batch.frames.len());

    for numbered in batch.frames {
        let block = numbered
            .frame
            .to_block()
            .with_context(|| format!("line {}: cannot encode intent frame", numbered.line))?;
        let result = runtime.run(&mut state, &mut cost, &block);
        decisions.push(SessionDecision {
            session: batch.session.clone(),
            line: numbered.line,
            result,
        });
    }

    debug!(
        session = %batch.session,
        steps = state.counter(),
        operations = cost.operations,
        bytes_in = cost.bytes_in,
        "Session finished"
    );
    store.commit(&batch.session, state);
    Ok(decisions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::parse_frames;
    use crate::tools::demo_registry;
    use latentflow_audit::verify_chain;
    use latentflow_types::DecisionStatus;

    const FRAMES: &str = r#"
{"session": "alice", "frame": {"intent": "transfer", "slots": {"to": "Bob", "amount": 100}}}
{"session": "bob", "frame": {"intent": "cancel_order", "slots": {"order_id": "A1"}}}
{"session": "alice", "frame": {"intent": "transfer", "slots": {"to": "Bob", "amount": 5000}}}
{"intent": "qa", "raw": "hours?"}
"#;

    #[tokio::test]
    async fn decisions_come_back_in_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RuntimeConfig::default();
        config.audit.path = Some(dir.path().join("audit.jsonl"));

        let decisions = run_sessions(&config, demo_registry(), parse_frames(FRAMES).unwrap())
            .await
            .unwrap();

        let lines: Vec<_> = decisions.iter().map(|d| (d.line, d.session.as_str())).collect();
        assert_eq!(lines, vec![(2, "alice"), (3, "bob"), (4, "alice"), (5, "default")]);

        let statuses: Vec<_> = decisions.iter().map(|d| d.result.status).collect();
        assert_eq!(
            statuses,
            vec![DecisionStatus::Ok, DecisionStatus::Ok, DecisionStatus::Deny, DecisionStatus::Ok]
        );

        let report = verify_chain(dir.path().join("audit.jsonl")).unwrap();
        assert!(report.valid);
    }

    #[tokio::test]
    async fn output_line_flattens_the_decision() {
        let decisions = run_sessions(&RuntimeConfig::default(), demo_registry(), parse_frames(FRAMES).unwrap())
            .await
            .unwrap();
        let line = serde_json::to_value(&decisions[0]).unwrap();
        assert_eq!(line["session"], "alice");
        assert_eq!(line["status"], "OK");
        assert!(line["decision_id"].is_string());
        assert_eq!(line["executed"][2], "submit_transfer");
    }
}
