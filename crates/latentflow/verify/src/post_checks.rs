use latentflow_types::IntentFrame;
use serde_json::Value;
use thiserror::Error;

/// A plan ran to completion but did not accomplish what the intent needs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PostCheckError {
    #[error("POSTCHECK_MISSING_SUBMIT: intent={intent} actions={executed:?}")]
    MissingSubmit {
        intent: String,
        executed: Vec<String>,
    },

    #[error("POSTCHECK_MISSING_CANCEL_ORDER: actions={executed:?}")]
    MissingCancelOrder { executed: Vec<String> },
}

impl PostCheckError {
    pub fn code(&self) -> &'static str {
        match self {
            PostCheckError::MissingSubmit { .. } => "POSTCHECK_MISSING_SUBMIT",
            PostCheckError::MissingCancelOrder { .. } => "POSTCHECK_MISSING_CANCEL_ORDER",
        }
    }
}

/// Semantic completion rules applied after execution.
///
/// `transfer` and `withdraw` must have run a `submit_*` action;
/// `cancel_order` must have run `cancel_order`. Other intents have no rule.
#[derive(Clone, Copy, Debug, Default)]
pub struct PostChecks;

impl PostChecks {
    pub fn check(
        &self,
        frame: &IntentFrame,
        executed: &[String],
        _tool_results: &[Value],
    ) -> Result<(), PostCheckError> {
        match frame.intent.as_str() {
            "transfer" | "withdraw" => {
                if !executed.iter().any(|a| a.starts_with("submit_")) {
                    return Err(PostCheckError::MissingSubmit {
                        intent: frame.intent.clone(),
                        executed: executed.to_vec(),
                    });
                }
            }
            "cancel_order" => {
                if !executed.iter().any(|a| a == "cancel_order") {
                    return Err(PostCheckError::MissingCancelOrder {
                        executed: executed.to_vec(),
                    });
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn transfer_needs_submit() {
        let frame = IntentFrame::new("transfer");
        let err = PostChecks
            .check(&frame, &names(&["check_user", "create_transfer"]), &[])
            .unwrap_err();
        assert_eq!(err.code(), "POSTCHECK_MISSING_SUBMIT");
        assert!(PostChecks
            .check(&frame, &names(&["create_transfer", "submit_transfer"]), &[])
            .is_ok());
    }

    #[test]
    fn cancel_needs_exact_action() {
        let frame = IntentFrame::new("cancel_order");
        assert!(PostChecks.check(&frame, &names(&["load_order"]), &[]).is_err());
        assert!(PostChecks
            .check(&frame, &names(&["load_order", "cancel_order"]), &[])
            .is_ok());
    }

    #[test]
    fn create_order_has_no_completion_rule() {
        let frame = IntentFrame::new("create_order");
        assert!(PostChecks.check(&frame, &names(&["create_order"]), &[]).is_ok());
    }
}
