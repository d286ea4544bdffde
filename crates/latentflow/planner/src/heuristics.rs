use std::collections::BTreeMap;

use latentflow_types::{Action, Plan};
use serde::{Deserialize, Serialize};

/// Plan cost: one unit per action plus a per-name surcharge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    #[serde(default = "default_step_cost")]
    pub step_cost: f64,
    #[serde(default = "default_surcharges")]
    pub surcharges: BTreeMap<String, f64>,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            step_cost: default_step_cost(),
            surcharges: default_surcharges(),
        }
    }
}

fn default_step_cost() -> f64 {
    1.0
}

fn default_surcharges() -> BTreeMap<String, f64> {
    BTreeMap::from([
        ("check_balance".to_string(), 0.5),
        ("submit_transfer".to_string(), 0.2),
        ("submit_withdraw".to_string(), 0.2),
    ])
}

impl CostModel {
    pub fn with_surcharge(mut self, action: impl Into<String>, extra: f64) -> Self {
        self.surcharges.insert(action.into(), extra);
        self
    }

    pub fn cost(&self, plan: &[Action]) -> f64 {
        plan.iter()
            .map(|a| self.step_cost + self.surcharges.get(&a.name).copied().unwrap_or(0.0))
            .sum()
    }

    /// Stable ascending sort; equal costs keep candidate order.
    pub fn rank(&self, plans: Vec<Plan>) -> Vec<Plan> {
        let mut scored: Vec<(f64, Plan)> = plans.into_iter().map(|p| (self.cost(&p), p)).collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));
        scored.into_iter().map(|(_, p)| p).collect()
    }
}

/// Cost under the default model.
pub fn plan_cost(plan: &[Action]) -> f64 {
    CostModel::default().cost(plan)
}

/// Rank under the default model.
pub fn rank_plans(plans: Vec<Plan>) -> Vec<Plan> {
    CostModel::default().rank(plans)
}
