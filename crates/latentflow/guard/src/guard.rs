use std::collections::BTreeMap;

use latentflow_state::LatentState;
use latentflow_types::Violation;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::rules::GuardRule;

/// Detail of the rule that stopped evaluation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FailedRule {
    pub rule: String,
    pub code: String,
    pub message: String,
    pub meta: BTreeMap<String, Value>,
}

/// Which rules were checked, which passed, and which (if any) failed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GuardTrace {
    pub checked: Vec<String>,
    pub passed: Vec<String>,
    pub failed: Option<FailedRule>,
}

/// A guard rule rejected the state.
///
/// Carries the partial trace up to and including the failing rule.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{violation}")]
pub struct GuardViolation {
    pub rule: String,
    pub violation: Violation,
    pub trace: GuardTrace,
}

impl GuardViolation {
    pub fn code(&self) -> &str {
        &self.violation.code
    }
}

/// Ordered list of safety-rail rules.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateGuard {
    #[serde(default)]
    rules: Vec<GuardRule>,
}

impl StateGuard {
    pub fn new(rules: Vec<GuardRule>) -> Self {
        Self { rules }
    }

    pub fn add_rule(&mut self, rule: GuardRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[GuardRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate rules in order, stopping at the first violation.
    pub fn check(&self, state: &LatentState) -> Result<GuardTrace, GuardViolation> {
        let mut trace = GuardTrace::default();

        for rule in &self.rules {
            let name = rule.name();
            trace.checked.push(name.clone());

            match rule.evaluate(state) {
                None => {
                    debug!(rule = %name, "Guard rule passed");
                    trace.passed.push(name);
                }
                Some(violation) => {
                    warn!(rule = %name, code = %violation.code, "Guard rule failed");
                    trace.failed = Some(FailedRule {
                        rule: name.clone(),
                        code: violation.code.clone(),
                        message: violation.message.clone(),
                        meta: violation.meta.clone(),
                    });
                    return Err(GuardViolation {
                        rule: name,
                        violation,
                        trace,
                    });
                }
            }
        }

        Ok(trace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use latentflow_types::Block;
    use serde_json::json;

    fn busy_state() -> LatentState {
        let mut state = LatentState::with_limits(2, 16);
        for n in 0..5 {
            state.update(Block::event(json!(n)));
        }
        state
    }

    #[test]
    fn passing_rules_are_all_recorded() {
        let guard = StateGuard::new(vec![GuardRule::max_steps(100), GuardRule::max_core_keys(4)]);
        let trace = guard.check(&busy_state()).unwrap();
        assert_eq!(trace.checked, trace.passed);
        assert_eq!(trace.checked.len(), 2);
        assert!(trace.failed.is_none());
    }

    #[test]
    fn first_failure_short_circuits() {
        let guard = StateGuard::new(vec![
            GuardRule::max_steps(1),
            GuardRule::max_core_keys(0),
            GuardRule::max_steps(1000),
        ]);
        let err = guard.check(&busy_state()).unwrap_err();

        assert_eq!(err.rule, "max_steps(1)");
        assert_eq!(err.code(), "MAX_STEPS");
        assert_eq!(err.trace.checked, vec!["max_steps(1)"]);
        assert!(err.trace.passed.is_empty());
        assert_eq!(err.trace.failed.as_ref().unwrap().rule, "max_steps(1)");
    }

    #[test]
    fn later_failure_keeps_earlier_passes() {
        let guard = StateGuard::new(vec![GuardRule::max_steps(100), GuardRule::max_core_keys(0)]);
        let err = guard.check(&busy_state()).unwrap_err();
        assert_eq!(err.trace.passed, vec!["max_steps(100)"]);
        assert_eq!(err.code(), "CORE_KEYS_OVERFLOW");
    }

    #[test]
    fn error_text_carries_code_for_classification() {
        let guard = StateGuard::new(vec![GuardRule::max_steps(0)]);
        let err = guard.check(&busy_state()).unwrap_err();
        assert!(err.to_string().starts_with("[MAX_STEPS]"));
    }

    #[test]
    fn empty_guard_passes() {
        let trace = StateGuard::default().check(&busy_state()).unwrap();
        assert!(trace.checked.is_empty());
    }
}
