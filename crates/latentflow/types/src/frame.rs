use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::block::Block;

/// Block type carried by intent frames.
pub const INTENT_BLOCK_TYPE: &str = "intent";

/// Constraint operators understood by the verifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintOp {
    Required,
    Forbidden,
    Le,
    Lt,
    Ge,
    Gt,
    Eq,
    Neq,
}

impl ConstraintOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintOp::Required => "required",
            ConstraintOp::Forbidden => "forbidden",
            ConstraintOp::Le => "le",
            ConstraintOp::Lt => "lt",
            ConstraintOp::Ge => "ge",
            ConstraintOp::Gt => "gt",
            ConstraintOp::Eq => "eq",
            ConstraintOp::Neq => "neq",
        }
    }
}

impl fmt::Display for ConstraintOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An explicit `{key, op, value}` condition attached to a frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub key: String,
    pub op: ConstraintOp,
    #[serde(default)]
    pub value: Value,
}

impl Constraint {
    pub fn new(key: impl Into<String>, op: ConstraintOp, value: Value) -> Self {
        Self {
            key: key.into(),
            op,
            value,
        }
    }
}

/// Canonical request representation handed over by the language pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntentFrame {
    pub intent: String,
    #[serde(default)]
    pub slots: BTreeMap<String, Value>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub trace: BTreeMap<String, Value>,
    #[serde(default)]
    pub raw: Option<String>,
}

impl IntentFrame {
    pub fn new(intent: impl Into<String>) -> Self {
        Self {
            intent: intent.into(),
            slots: BTreeMap::new(),
            constraints: Vec::new(),
            confidence: 0.0,
            trace: BTreeMap::new(),
            raw: None,
        }
    }

    pub fn with_slot(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.slots.insert(key.into(), value.into());
        self
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = Some(raw.into());
        self
    }

    /// Slot lookup; JSON `null` counts as absent.
    pub fn slot(&self, key: &str) -> Option<&Value> {
        self.slots.get(key).filter(|v| !v.is_null())
    }

    /// Wrap the frame in an `"intent"` block.
    pub fn to_block(&self) -> Result<Block, FrameError> {
        let content = serde_json::to_value(self).map_err(|e| FrameError::Encode(e.to_string()))?;
        Ok(Block::new(content, INTENT_BLOCK_TYPE))
    }
}

impl TryFrom<&Block> for IntentFrame {
    type Error = FrameError;

    fn try_from(block: &Block) -> Result<Self, Self::Error> {
        if block.block_type() != INTENT_BLOCK_TYPE {
            return Err(FrameError::WrongBlockType(block.block_type().to_string()));
        }
        serde_json::from_value(block.content().clone()).map_err(|e| FrameError::Decode(e.to_string()))
    }
}

/// Errors converting between frames and blocks.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    #[error("expected an intent block, got block_type {0}")]
    WrongBlockType(String),

    #[error("malformed intent frame: {0}")]
    Decode(String),

    #[error("intent frame could not be encoded: {0}")]
    Encode(String),
}
