use latentflow_types::{Constraint, ConstraintOp, IntentFrame, Violation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::policy::Policy;
use crate::value::{as_number, is_empty, loosely_equal};

/// Names of the checks that ran and passed, in order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyTrace {
    pub checked: Vec<String>,
    pub passed: Vec<String>,
}

impl VerifyTrace {
    fn pass(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.checked.push(name.clone());
        self.passed.push(name);
    }
}

/// Policy or constraint rejection.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct ConstraintViolation(pub Violation);

impl ConstraintViolation {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self(Violation::new(code, message))
    }

    fn meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.meta.insert(key.to_string(), value.into());
        self
    }

    pub fn code(&self) -> &str {
        &self.0.code
    }

    pub fn violation(&self) -> &Violation {
        &self.0
    }
}

/// Checks an intent frame against policy, then its explicit constraints.
///
/// Order is fixed: allowed intents, blocked targets, amount ceilings, then
/// each constraint as listed. The first failure ends verification.
#[derive(Clone, Debug, Default)]
pub struct ConstraintsVerifier {
    policy: Policy,
}

impl ConstraintsVerifier {
    pub fn new(policy: Policy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn verify_intent_frame(&self, frame: &IntentFrame) -> Result<VerifyTrace, ConstraintViolation> {
        let result = self.run_checks(frame);
        match &result {
            Ok(trace) => debug!(
                intent = %frame.intent,
                checks = trace.checked.len(),
                "Intent frame verified"
            ),
            Err(v) => warn!(intent = %frame.intent, code = %v.code(), "Intent frame rejected"),
        }
        result
    }

    fn run_checks(&self, frame: &IntentFrame) -> Result<VerifyTrace, ConstraintViolation> {
        let mut trace = VerifyTrace::default();
        let intent = frame.intent.as_str();

        if !self.policy.allowed_intents.contains(intent) {
            return Err(
                ConstraintViolation::new("POLICY_INTENT_DENY", format!("intent not allowed: {intent}"))
                    .meta("intent", intent),
            );
        }
        trace.pass("policy.allowed_intents");

        if let Some(to) = frame.slot("to").and_then(Value::as_str) {
            if self.policy.blocked_targets.contains(to) {
                return Err(
                    ConstraintViolation::new("POLICY_BLOCKED_TARGET", format!("target blocked: {to}"))
                        .meta("to", to),
                );
            }
        }
        trace.pass("policy.blocked_targets");

        let amount = self.amount(frame)?;
        if let Some(amt) = amount {
            let ceiling = match intent {
                "transfer" => Some(("POLICY_MAX_TRANSFER", self.policy.max_transfer_amount)),
                "withdraw" => Some(("POLICY_MAX_WITHDRAW", self.policy.max_withdraw_amount)),
                _ => None,
            };
            if let Some((code, max)) = ceiling {
                if amt > max {
                    return Err(ConstraintViolation::new(
                        code,
                        format!("{intent} amount exceeds policy max: {amt} > {max}"),
                    )
                    .meta("amount", amt)
                    .meta("max", max));
                }
            }
        }
        trace.pass("policy.max_amount");

        for constraint in &frame.constraints {
            let name = format!("constraint:{}:{}", constraint.key, constraint.op);
            self.check_constraint(frame, constraint, amount)?;
            trace.pass(name);
        }

        Ok(trace)
    }

    fn amount(&self, frame: &IntentFrame) -> Result<Option<f64>, ConstraintViolation> {
        match frame.slot("amount") {
            None => Ok(None),
            Some(raw) => as_number(raw).map(Some).ok_or_else(|| {
                ConstraintViolation::new("POLICY_AMOUNT_INVALID", format!("amount is not a number: {raw}"))
                    .meta("amount", raw.clone())
            }),
        }
    }

    fn check_constraint(
        &self,
        frame: &IntentFrame,
        constraint: &Constraint,
        amount: Option<f64>,
    ) -> Result<(), ConstraintViolation> {
        let key = constraint.key.as_str();
        let expected = &constraint.value;
        let current = frame.slot(key);

        match constraint.op {
            ConstraintOp::Required => {
                if expected == &Value::Bool(true) && is_empty(current) {
                    return Err(
                        ConstraintViolation::new("CONSTRAINT_REQUIRED", format!("{key} required"))
                            .meta("key", key),
                    );
                }
            }
            ConstraintOp::Forbidden => {
                let threshold = self.policy.require_approval_over;
                if key == "requires_approval" && expected == &Value::Bool(true) {
                    if let Some(amt) = amount.filter(|a| *a > threshold) {
                        return Err(ConstraintViolation::new(
                            "CONSTRAINT_FORBID_APPROVAL",
                            "approval required by policy but forbidden by user constraint",
                        )
                        .meta("amount", amt)
                        .meta("threshold", threshold));
                    }
                }
            }
            ConstraintOp::Le | ConstraintOp::Lt | ConstraintOp::Ge | ConstraintOp::Gt => {
                let Some(cur) = current else {
                    return Ok(());
                };
                let (Some(c), Some(v)) = (as_number(cur), as_number(expected)) else {
                    return Err(ConstraintViolation::new(
                        "CONSTRAINT_NOT_NUMERIC",
                        format!("{key} cannot be compared numerically: {cur} vs {expected}"),
                    )
                    .meta("cur", cur.clone())
                    .meta("val", expected.clone()));
                };
                let failure = match constraint.op {
                    ConstraintOp::Le if c > v => Some(("CONSTRAINT_LE", format!("{key} exceeds constraint: {c} > {v}"))),
                    ConstraintOp::Lt if c >= v => Some(("CONSTRAINT_LT", format!("{key} violates constraint: {c} >= {v}"))),
                    ConstraintOp::Ge if c < v => Some(("CONSTRAINT_GE", format!("{key} violates constraint: {c} < {v}"))),
                    ConstraintOp::Gt if c <= v => Some(("CONSTRAINT_GT", format!("{key} violates constraint: {c} <= {v}"))),
                    _ => None,
                };
                if let Some((code, message)) = failure {
                    return Err(ConstraintViolation::new(code, message)
                        .meta("cur", cur.clone())
                        .meta("val", expected.clone()));
                }
            }
            ConstraintOp::Eq => {
                if !loosely_equal(current, expected) {
                    return Err(ConstraintViolation::new(
                        "CONSTRAINT_EQ",
                        format!("{key} must equal {expected}"),
                    )
                    .meta("cur", current.cloned().unwrap_or(Value::Null))
                    .meta("val", expected.clone()));
                }
            }
            ConstraintOp::Neq => {
                if loosely_equal(current, expected) {
                    return Err(ConstraintViolation::new(
                        "CONSTRAINT_NEQ",
                        format!("{key} must not equal {expected}"),
                    )
                    .meta("cur", current.cloned().unwrap_or(Value::Null))
                    .meta("val", expected.clone()));
                }
            }
        }

        Ok(())
    }
}
