use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Business limits and permissions, fixed for the lifetime of a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    /// Intents this deployment may act on
    #[serde(default = "default_allowed_intents")]
    pub allowed_intents: BTreeSet<String>,
    /// Ceiling for `transfer` amounts (default: 1000.0)
    #[serde(default = "default_max_amount")]
    pub max_transfer_amount: f64,
    /// Ceiling for `withdraw` amounts (default: 1000.0)
    #[serde(default = "default_max_amount")]
    pub max_withdraw_amount: f64,
    /// Amounts above this need approval (default: 500.0)
    #[serde(default = "default_require_approval_over")]
    pub require_approval_over: f64,
    /// Recipients that may never be targeted
    #[serde(default)]
    pub blocked_targets: BTreeSet<String>,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            allowed_intents: default_allowed_intents(),
            max_transfer_amount: default_max_amount(),
            max_withdraw_amount: default_max_amount(),
            require_approval_over: default_require_approval_over(),
            blocked_targets: BTreeSet::new(),
        }
    }
}

impl Policy {
    pub fn with_max_transfer_amount(mut self, amount: f64) -> Self {
        self.max_transfer_amount = amount;
        self
    }

    pub fn with_max_withdraw_amount(mut self, amount: f64) -> Self {
        self.max_withdraw_amount = amount;
        self
    }

    pub fn with_require_approval_over(mut self, amount: f64) -> Self {
        self.require_approval_over = amount;
        self
    }

    pub fn with_blocked_target(mut self, target: impl Into<String>) -> Self {
        self.blocked_targets.insert(target.into());
        self
    }

    pub fn with_allowed_intents<I, S>(mut self, intents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_intents = intents.into_iter().map(Into::into).collect();
        self
    }
}

fn default_allowed_intents() -> BTreeSet<String> {
    ["transfer", "withdraw", "cancel_order", "create_order", "qa"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_max_amount() -> f64 {
    1000.0
}

fn default_require_approval_over() -> f64 {
    500.0
}
