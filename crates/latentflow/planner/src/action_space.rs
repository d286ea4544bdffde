use latentflow_state::LatentState;
use latentflow_types::{Action, IntentFrame, Plan};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Source of candidate plans for an intent frame.
///
/// Implementations must be deterministic; candidate order is the tie-break
/// when two plans cost the same.
pub trait ActionSpace: Send + Sync {
    fn candidates(&self, frame: &IntentFrame, state: Option<&LatentState>) -> Vec<Plan>;
}

/// Fixed per-intent plan templates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemplateActionSpace {
    /// Currency used when the frame carries none (default: "CNY")
    #[serde(default = "default_currency")]
    pub default_currency: String,
    /// Append `submit_order` to the `create_order` template (default: false)
    #[serde(default)]
    pub submit_orders: bool,
}

impl Default for TemplateActionSpace {
    fn default() -> Self {
        Self {
            default_currency: default_currency(),
            submit_orders: false,
        }
    }
}

fn default_currency() -> String {
    "CNY".to_string()
}

impl TemplateActionSpace {
    pub fn new(default_currency: impl Into<String>, submit_orders: bool) -> Self {
        Self {
            default_currency: default_currency.into(),
            submit_orders,
        }
    }

    fn currency(&self, frame: &IntentFrame) -> Value {
        frame
            .slot("currency")
            .cloned()
            .unwrap_or_else(|| Value::String(self.default_currency.clone()))
    }
}

fn slot(frame: &IntentFrame, key: &str) -> Value {
    frame.slot(key).cloned().unwrap_or(Value::Null)
}

impl ActionSpace for TemplateActionSpace {
    fn candidates(&self, frame: &IntentFrame, _state: Option<&LatentState>) -> Vec<Plan> {
        match frame.intent.as_str() {
            "transfer" => {
                let to = slot(frame, "to");
                let amount = slot(frame, "amount");
                let currency = self.currency(frame);
                let create = Action::new("create_transfer")
                    .with_param("to", to.clone())
                    .with_param("amount", amount.clone())
                    .with_param("currency", currency.clone());
                vec![
                    vec![
                        Action::new("check_user").with_param("user", to.clone()),
                        Action::new("check_balance")
                            .with_param("currency", currency)
                            .with_param("amount", amount),
                        create.clone(),
                        Action::new("submit_transfer"),
                    ],
                    // Skips the balance check.
                    vec![
                        Action::new("check_user").with_param("user", to),
                        create,
                        Action::new("submit_transfer"),
                    ],
                ]
            }
            "withdraw" => {
                let amount = slot(frame, "amount");
                let currency = self.currency(frame);
                vec![vec![
                    Action::new("check_balance")
                        .with_param("currency", currency.clone())
                        .with_param("amount", amount.clone()),
                    Action::new("submit_withdraw")
                        .with_param("amount", amount)
                        .with_param("currency", currency),
                ]]
            }
            "cancel_order" => {
                let order_id = slot(frame, "order_id");
                vec![vec![
                    Action::new("load_order").with_param("order_id", order_id.clone()),
                    Action::new("cancel_order").with_param("order_id", order_id),
                ]]
            }
            "create_order" => {
                let mut plan = vec![Action::new("create_order").with_param("item", slot(frame, "item"))];
                if self.submit_orders {
                    plan.push(Action::new("submit_order"));
                }
                vec![plan]
            }
            "qa" => {
                let query = frame.raw.clone().map(Value::String).unwrap_or(Value::Null);
                vec![vec![Action::new("answer").with_param("query", query)]]
            }
            _ => Vec::new(),
        }
    }
}
