use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structured failure record: machine-readable code, human message, metadata.
///
/// Guard rules, policy checks and constraint checks all report through this
/// type. The rendered form `[CODE] message meta={...}` is what failure
/// classification matches on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub meta: BTreeMap<String, Value>,
}

impl Violation {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            meta: BTreeMap::new(),
        }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let meta = serde_json::to_string(&self.meta).map_err(|_| fmt::Error)?;
        write!(f, "[{}] {} meta={}", self.code, self.message, meta)
    }
}

impl std::error::Error for Violation {}
