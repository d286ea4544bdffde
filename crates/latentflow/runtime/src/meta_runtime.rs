use std::sync::Arc;

use latentflow_audit::{AuditPayload, AuditSink};
use latentflow_executor::ToolExecutor;
use latentflow_meta::{AffectKnobs, AffectState, CausalMemory, FailureKind, LearningStats, Reflector};
use latentflow_planner::{ConstrainedPlanner, PlanTrace};
use latentflow_state::LatentState;
use latentflow_types::{action_names, Action, Block, BlockId, DecisionStatus, IntentFrame, Plan};
use latentflow_verify::PostChecks;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

use crate::cost::CostCounter;
use crate::engine::Engine;
use crate::transaction::ConsumeReceipt;

/// One executed action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecStep {
    pub action: String,
    pub ok: bool,
    pub error: Option<String>,
    /// Id of the result block fed back into state
    pub block_id: BlockId,
    /// Whether the feedback transaction committed
    pub consumed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostCheckTrace {
    pub ok: bool,
    pub error: Option<String>,
}

/// Everything the runtime saw while deciding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecisionTrace {
    /// Knobs as they were when the run started
    pub affect: AffectKnobs,
    /// Receipt of the intent transaction
    pub consume: Option<ConsumeReceipt>,
    pub plan_trace: Option<PlanTrace>,
    pub exec: Vec<ExecStep>,
    pub postcheck: Option<PostCheckTrace>,
    /// Set when an invariant broke during the run
    pub fatal: bool,
}

/// Output of one [`MetaRuntime::run`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecisionResult {
    pub decision_id: Uuid,
    pub status: DecisionStatus,
    /// Content of the intent block as received
    pub intent_frame: Value,
    pub plan: Option<Plan>,
    pub executed: Vec<String>,
    pub tool_results: Vec<Value>,
    pub trace: DecisionTrace,
    pub error: Option<String>,
    pub failure_kind: Option<FailureKind>,
}

impl DecisionResult {
    fn start(intent_frame: Value, affect: AffectKnobs) -> Self {
        Self {
            decision_id: Uuid::new_v4(),
            status: DecisionStatus::Fail,
            intent_frame,
            plan: None,
            executed: Vec::new(),
            tool_results: Vec::new(),
            trace: DecisionTrace {
                affect,
                consume: None,
                plan_trace: None,
                exec: Vec::new(),
                postcheck: None,
                fatal: false,
            },
            error: None,
            failure_kind: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == DecisionStatus::Ok
    }
}

/// The per-session decision loop: consume, plan, execute, post-check,
/// reflect.
///
/// Owns the session's modulators (affect, learning, causal memory), so each
/// session gets its own runtime. The engine, planner and executor are
/// shareable.
pub struct MetaRuntime {
    engine: Arc<Engine>,
    planner: ConstrainedPlanner,
    executor: ToolExecutor,
    post_checks: PostChecks,
    reflector: Reflector,
    affect: AffectState,
    learning: LearningStats,
    causal: CausalMemory,
}

impl MetaRuntime {
    pub fn new(engine: Arc<Engine>, planner: ConstrainedPlanner, executor: ToolExecutor) -> Self {
        Self {
            engine,
            planner,
            executor,
            post_checks: PostChecks,
            reflector: Reflector,
            affect: AffectState::default(),
            learning: LearningStats::default(),
            causal: CausalMemory::default(),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn affect(&self) -> &AffectState {
        &self.affect
    }

    pub fn learning(&self) -> &LearningStats {
        &self.learning
    }

    pub fn causal(&self) -> &CausalMemory {
        &self.causal
    }

    /// Decide on one intent block.
    ///
    /// `state` is left either with every committed transaction of this run
    /// applied, or untouched by the transaction that failed.
    pub fn run(&mut self, state: &mut LatentState, cost: &mut CostCounter, intent_block: &Block) -> DecisionResult {
        let knobs = self.affect.knobs();
        let mut result = DecisionResult::start(intent_block.content().clone(), knobs);

        let frame = match IntentFrame::try_from(intent_block) {
            Ok(frame) => frame,
            Err(e) => {
                self.affect.update_on_failure();
                return self.conclude(None, self.failed(result, e.to_string(), "decode"));
            }
        };

        match self.engine.consume(state, intent_block.clone(), cost) {
            Ok(receipt) => result.trace.consume = Some(receipt),
            Err(e) => {
                self.affect.update_on_failure();
                result.trace.fatal = e.is_fatal();
                return self.conclude(Some(&frame), self.failed(result, e.to_string(), "consume"));
            }
        }

        let (plan, plan_trace) = self.planner.plan(&frame, Some(&*state));
        result.error = plan_trace.error.clone();
        result.trace.plan_trace = Some(plan_trace);
        let Some(plan) = plan else {
            result.status = if knobs.prefers_clarification() {
                DecisionStatus::NeedClarification
            } else {
                DecisionStatus::Deny
            };
            self.affect.update_on_failure();
            return self.conclude(Some(&frame), result);
        };
        result.error = None;

        let plan_names = action_names(&plan);
        let mut failure = self.execute(&plan, state, cost, &mut result);

        if failure.is_none() {
            match self.post_checks.check(&frame, &result.executed, &result.tool_results) {
                Ok(()) => {
                    result.trace.postcheck = Some(PostCheckTrace { ok: true, error: None });
                }
                Err(e) => {
                    result.trace.postcheck = Some(PostCheckTrace {
                        ok: false,
                        error: Some(e.to_string()),
                    });
                    failure = Some((e.to_string(), "postcheck"));
                }
            }
        }
        result.plan = Some(plan);

        match failure {
            None => {
                self.affect.update_on_success();
                self.learning.record(&frame.intent, &plan_names, true, None);
                self.causal.add(&frame, &plan_names, true, None);
                result.status = DecisionStatus::Ok;
                self.conclude(Some(&frame), result)
            }
            Some((message, stage)) => {
                self.affect.update_on_failure();
                let result = self.failed(result, message, stage);
                self.learning.record(&frame.intent, &plan_names, false, result.failure_kind);
                self.causal.add(&frame, &plan_names, false, result.failure_kind);
                self.conclude(Some(&frame), result)
            }
        }
    }

    /// Run actions in order, feeding each result block back through a
    /// transaction. Stops at the first failed tool or rejected feedback.
    fn execute(
        &self,
        plan: &[Action],
        state: &mut LatentState,
        cost: &mut CostCounter,
        result: &mut DecisionResult,
    ) -> Option<(String, &'static str)> {
        for action in plan {
            let outcome = self.executor.execute(action);
            result.executed.push(action.name.clone());
            result.tool_results.push(outcome.block.content().clone());
            let block_id = outcome.block.block_id().clone();

            let consumed = self.engine.consume(state, outcome.block, cost);
            result.trace.exec.push(ExecStep {
                action: action.name.clone(),
                ok: outcome.ok,
                error: outcome.error.clone(),
                block_id,
                consumed: consumed.is_ok(),
            });

            if let Err(e) = consumed {
                result.trace.fatal |= e.is_fatal();
                return Some((e.to_string(), "feedback"));
            }
            if !outcome.ok {
                return Some((outcome.error.unwrap_or_else(|| "tool_error".to_string()), "execute"));
            }
        }
        None
    }

    fn failed(&self, mut result: DecisionResult, message: String, stage: &str) -> DecisionResult {
        let reflection = self.reflector.classify_failure(message, stage);
        result.status = DecisionStatus::Fail;
        result.failure_kind = Some(reflection.kind);
        result.error = Some(reflection.message);
        result
    }

    fn conclude(&self, frame: Option<&IntentFrame>, result: DecisionResult) -> DecisionResult {
        let intent = frame.map(|f| f.intent.as_str()).unwrap_or("unknown");
        if result.trace.fatal {
            error!(decision_id = %result.decision_id, error = ?result.error, "Decision aborted by invariant violation");
        }
        info!(
            decision_id = %result.decision_id,
            status = %result.status,
            intent,
            executed = result.executed.len(),
            "Decision reached"
        );

        if let Some(audit) = self.engine.audit() {
            audit.emit(
                "decision",
                AuditPayload::new()
                    .with("decision_id", result.decision_id)
                    .with("status", result.status)
                    .with("intent", intent)
                    .with("plan", result.plan.as_deref().map(action_names))
                    .with("executed", &result.executed)
                    .with("error", &result.error)
                    .with("failure_kind", result.failure_kind)
                    .with("affect", self.affect.knobs()),
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use latentflow_audit::MemoryAuditSink;
    use latentflow_executor::{ToolError, ToolRegistry};
    use serde_json::json;

    fn runtime(registry: ToolRegistry, audit: Arc<MemoryAuditSink>) -> MetaRuntime {
        let engine = Engine::new().with_invariants(true).with_audit(audit);
        MetaRuntime::new(
            Arc::new(engine),
            ConstrainedPlanner::default(),
            ToolExecutor::new(Arc::new(registry)),
        )
    }

    fn echo_registry(names: &[&str]) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        for name in names {
            let n = name.to_string();
            registry.register_fn(*name, move |_| Ok(json!({"tool": n.clone()})));
        }
        registry
    }

    fn intent(frame: IntentFrame) -> Block {
        frame.to_block().unwrap()
    }

    #[test]
    fn cancel_order_succeeds() {
        let audit = Arc::new(MemoryAuditSink::new());
        let mut rt = runtime(echo_registry(&["load_order", "cancel_order"]), audit.clone());
        let mut state = LatentState::default();
        let mut cost = CostCounter::new();

        let result = rt.run(
            &mut state,
            &mut cost,
            &intent(IntentFrame::new("cancel_order").with_slot("order_id", "A1")),
        );

        assert_eq!(result.status, DecisionStatus::Ok);
        assert_eq!(result.executed, vec!["load_order", "cancel_order"]);
        assert_eq!(result.tool_results.len(), 2);
        assert_eq!(state.counter(), 3);
        assert_eq!(result.trace.postcheck, Some(PostCheckTrace { ok: true, error: None }));
        assert_eq!(audit.events().last().map(String::as_str), Some("decision"));
        assert_eq!(rt.learning().success_rate_intent("cancel_order"), 1.0);
    }

    #[test]
    fn policy_rejection_is_deny_for_fresh_session() {
        let mut rt = runtime(echo_registry(&[]), Arc::new(MemoryAuditSink::new()));
        let mut state = LatentState::default();
        let result = rt.run(
            &mut state,
            &mut CostCounter::new(),
            &intent(IntentFrame::new("transfer").with_slot("amount", 1500)),
        );
        assert_eq!(result.status, DecisionStatus::Deny);
        assert!(result.error.unwrap().contains("POLICY_MAX_TRANSFER"));
        assert!(result.executed.is_empty());
        // The intent itself was consumed.
        assert_eq!(state.counter(), 1);
    }

    #[test]
    fn tired_session_asks_for_clarification() {
        let mut rt = runtime(echo_registry(&[]), Arc::new(MemoryAuditSink::new()));
        let mut state = LatentState::default();
        let mut statuses = Vec::new();
        for i in 0..4 {
            let frame = IntentFrame::new("transfer").with_slot("amount", 5000 + i);
            statuses.push(rt.run(&mut state, &mut CostCounter::new(), &intent(frame)).status);
        }
        assert_eq!(
            statuses,
            vec![
                DecisionStatus::Deny,
                DecisionStatus::Deny,
                DecisionStatus::Deny,
                DecisionStatus::NeedClarification,
            ]
        );
    }

    #[test]
    fn missing_tool_fails_and_keeps_partial_trace() {
        let mut rt = runtime(echo_registry(&["check_user"]), Arc::new(MemoryAuditSink::new()));
        let mut state = LatentState::default();
        let result = rt.run(
            &mut state,
            &mut CostCounter::new(),
            &intent(IntentFrame::new("transfer").with_slot("to", "Bob").with_slot("amount", 10)),
        );

        assert_eq!(result.status, DecisionStatus::Fail);
        assert_eq!(result.failure_kind, Some(FailureKind::ToolError));
        assert_eq!(result.executed, vec!["check_user", "create_transfer"]);
        assert!(result.error.unwrap().contains("Tool not found: create_transfer"));
        assert!(result.trace.postcheck.is_none());
        assert_eq!(rt.learning().failure_kinds[&FailureKind::ToolError], 1);
    }

    #[test]
    fn tool_error_text_is_classified() {
        let mut registry = echo_registry(&["load_order"]);
        registry.register_fn("cancel_order", |_| Err(ToolError::new("order already shipped")));
        let mut rt = runtime(registry, Arc::new(MemoryAuditSink::new()));
        let result = rt.run(
            &mut LatentState::default(),
            &mut CostCounter::new(),
            &intent(IntentFrame::new("cancel_order").with_slot("order_id", "A1")),
        );
        assert_eq!(result.failure_kind, Some(FailureKind::ToolError));
        assert_eq!(result.trace.exec.len(), 2);
        assert!(!result.trace.exec[1].ok);
        assert!(result.trace.exec[1].consumed);
    }

    #[test]
    fn malformed_intent_block_fails_without_consuming() {
        let mut rt = runtime(echo_registry(&[]), Arc::new(MemoryAuditSink::new()));
        let mut state = LatentState::default();
        let block = Block::new(json!({"slots": 3}), "intent");
        let result = rt.run(&mut state, &mut CostCounter::new(), &block);
        assert_eq!(result.status, DecisionStatus::Fail);
        assert_eq!(state.seen_events(), 0);
        assert_eq!(result.intent_frame, json!({"slots": 3}));
    }
}
