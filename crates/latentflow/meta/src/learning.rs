use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::reflection::FailureKind;

/// Outcome counts per intent, per action and per failure kind.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningStats {
    pub intent_success: BTreeMap<String, u64>,
    pub intent_fail: BTreeMap<String, u64>,
    pub action_success: BTreeMap<String, u64>,
    pub action_fail: BTreeMap<String, u64>,
    pub failure_kinds: BTreeMap<FailureKind, u64>,
}

/// Planner-facing weights: reliable actions weigh less.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningHeuristics {
    /// `1.5 - success_rate`, roughly within `[0.5, 1.5]`
    pub action_weights: BTreeMap<String, f64>,
    pub intent_success_rate: BTreeMap<String, f64>,
}

fn bump(map: &mut BTreeMap<String, u64>, key: &str) {
    *map.entry(key.to_string()).or_default() += 1;
}

fn rate(success: u64, fail: u64) -> f64 {
    match success + fail {
        0 => 0.5,
        total => success as f64 / total as f64,
    }
}

impl LearningStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record<S: AsRef<str>>(&mut self, intent: &str, actions: &[S], ok: bool, failure: Option<FailureKind>) {
        if ok {
            bump(&mut self.intent_success, intent);
            for a in actions {
                bump(&mut self.action_success, a.as_ref());
            }
        } else {
            bump(&mut self.intent_fail, intent);
            for a in actions {
                bump(&mut self.action_fail, a.as_ref());
            }
            if let Some(kind) = failure {
                *self.failure_kinds.entry(kind).or_default() += 1;
            }
        }
    }

    /// 0.5 when nothing is known.
    pub fn success_rate_intent(&self, intent: &str) -> f64 {
        rate(
            self.intent_success.get(intent).copied().unwrap_or(0),
            self.intent_fail.get(intent).copied().unwrap_or(0),
        )
    }

    pub fn success_rate_action(&self, action: &str) -> f64 {
        rate(
            self.action_success.get(action).copied().unwrap_or(0),
            self.action_fail.get(action).copied().unwrap_or(0),
        )
    }

    pub fn heuristics(&self) -> LearningHeuristics {
        let action_weights = self
            .action_success
            .keys()
            .chain(self.action_fail.keys())
            .map(|a| (a.clone(), 1.5 - self.success_rate_action(a)))
            .collect();
        let intent_success_rate = self
            .intent_success
            .keys()
            .chain(self.intent_fail.keys())
            .map(|i| (i.clone(), self.success_rate_intent(i)))
            .collect();
        LearningHeuristics {
            action_weights,
            intent_success_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_rates_are_neutral() {
        let stats = LearningStats::new();
        assert_eq!(stats.success_rate_intent("transfer"), 0.5);
        assert_eq!(stats.success_rate_action("submit_transfer"), 0.5);
    }

    #[test]
    fn weights_favour_reliable_actions() {
        let mut stats = LearningStats::new();
        stats.record("transfer", &["check_user", "submit_transfer"], true, None);
        stats.record("transfer", &["check_user"], false, Some(FailureKind::ToolError));

        let h = stats.heuristics();
        assert_eq!(h.action_weights["submit_transfer"], 0.5);
        assert_eq!(h.action_weights["check_user"], 1.0);
        assert_eq!(h.intent_success_rate["transfer"], 0.5);
        assert_eq!(stats.failure_kinds[&FailureKind::ToolError], 1);
    }

    #[test]
    fn failure_kind_only_counted_on_failure() {
        let mut stats = LearningStats::new();
        stats.record::<&str>("qa", &[], true, Some(FailureKind::UnknownFailure));
        assert!(stats.failure_kinds.is_empty());
    }
}
