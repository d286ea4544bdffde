use std::sync::Arc;

use latentflow_state::LatentState;
use latentflow_types::{action_names, IntentFrame, Plan};
use latentflow_verify::{ConstraintsVerifier, VerifyTrace};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::action_space::{ActionSpace, TemplateActionSpace};
use crate::heuristics::CostModel;

/// Error code recorded when verification passed but no candidate exists.
pub const NO_PLAN: &str = "NO_PLAN";

/// What the planner saw and chose.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanTrace {
    pub candidates: usize,
    pub selected: Option<Vec<String>>,
    pub constraint_trace: Option<VerifyTrace>,
    /// Rendered failure, `[CODE] message meta={...}` for violations
    pub error: Option<String>,
    pub error_code: Option<String>,
}

/// Verify, generate candidates, rank, pick the cheapest.
#[derive(Clone)]
pub struct ConstrainedPlanner {
    verifier: ConstraintsVerifier,
    action_space: Arc<dyn ActionSpace>,
    cost_model: CostModel,
}

impl Default for ConstrainedPlanner {
    fn default() -> Self {
        Self::new(ConstraintsVerifier::default())
    }
}

impl ConstrainedPlanner {
    pub fn new(verifier: ConstraintsVerifier) -> Self {
        Self {
            verifier,
            action_space: Arc::new(TemplateActionSpace::default()),
            cost_model: CostModel::default(),
        }
    }

    pub fn with_action_space(mut self, action_space: Arc<dyn ActionSpace>) -> Self {
        self.action_space = action_space;
        self
    }

    pub fn with_cost_model(mut self, cost_model: CostModel) -> Self {
        self.cost_model = cost_model;
        self
    }

    pub fn verifier(&self) -> &ConstraintsVerifier {
        &self.verifier
    }

    /// Plan for `frame`. Returns `None` with a populated `error` when the
    /// frame is rejected or no candidate exists.
    pub fn plan(&self, frame: &IntentFrame, state: Option<&LatentState>) -> (Option<Plan>, PlanTrace) {
        let mut trace = PlanTrace::default();

        match self.verifier.verify_intent_frame(frame) {
            Ok(ctrace) => trace.constraint_trace = Some(ctrace),
            Err(violation) => {
                trace.error_code = Some(violation.code().to_string());
                trace.error = Some(violation.to_string());
                return (None, trace);
            }
        }

        let candidates = self.action_space.candidates(frame, state);
        trace.candidates = candidates.len();
        if candidates.is_empty() {
            debug!(intent = %frame.intent, "No candidate plans");
            trace.error_code = Some(NO_PLAN.to_string());
            trace.error = Some(format!("[{NO_PLAN}] no candidate plan for intent {}", frame.intent));
            return (None, trace);
        }

        let plan = self.cost_model.rank(candidates).into_iter().next();
        if let Some(plan) = &plan {
            let names = action_names(plan);
            info!(
                intent = %frame.intent,
                candidates = trace.candidates,
                selected = ?names,
                cost = self.cost_model.cost(plan),
                "Plan selected"
            );
            trace.selected = Some(names);
        }
        (plan, trace)
    }
}
