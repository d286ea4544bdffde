use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single named domain step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
}

/// An ordered list of actions.
pub type Plan = Vec<Action>;

impl Action {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: BTreeMap::new(),
        }
    }

    /// Add a parameter. `None`-like values are stored as JSON `null`, the
    /// tool decides what absence means.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = serde_json::to_string(&self.params).map_err(|_| fmt::Error)?;
        write!(f, "Action(name={}, params={})", self.name, params)
    }
}

/// Names of the actions in a plan, in order.
pub fn action_names(plan: &[Action]) -> Vec<String> {
    plan.iter().map(|a| a.name.clone()).collect()
}
