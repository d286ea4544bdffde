use std::sync::Arc;

use latentflow_audit::{AuditPayload, AuditSink};
use latentflow_types::{Action, Block, Fingerprint};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::registry::ToolRegistry;
use crate::ExecutorError;

/// Block type of executor output.
pub const TOOL_RESULT_BLOCK_TYPE: &str = "tool_result";

/// Result of running one action; never an error.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub block: Block,
    pub ok: bool,
    pub error: Option<String>,
}

/// Runs actions through a [`ToolRegistry`].
#[derive(Clone)]
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    audit: Option<Arc<dyn AuditSink>>,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            audit: None,
        }
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run `action`, propagating lookup and tool failures.
    pub fn try_execute(&self, action: &Action) -> Result<Block, ExecutorError> {
        let result = self.call(action);
        self.audit_call(action, &result);
        let value = result?;
        Ok(result_block(action, true, "result", value))
    }

    /// Run `action`, converting any failure into a failed result block.
    pub fn execute(&self, action: &Action) -> ToolOutcome {
        let result = self.call(action);
        self.audit_call(action, &result);
        match result {
            Ok(value) => ToolOutcome {
                block: result_block(action, true, "result", value),
                ok: true,
                error: None,
            },
            Err(e) => {
                let message = e.to_string();
                warn!(action = %action.name, error = %message, "Tool execution failed");
                ToolOutcome {
                    block: result_block(action, false, "error", Value::String(message.clone())),
                    ok: false,
                    error: Some(message),
                }
            }
        }
    }

    fn call(&self, action: &Action) -> Result<Value, ExecutorError> {
        let tool = self.registry.get(&action.name)?;
        debug!(action = %action.name, "Executing tool");
        tool.call(&action.params).map_err(|e| ExecutorError::ToolFailed {
            tool: action.name.clone(),
            message: e.to_string(),
        })
    }

    fn audit_call(&self, action: &Action, result: &Result<Value, ExecutorError>) {
        let Some(audit) = &self.audit else {
            return;
        };
        let mut payload = AuditPayload::new()
            .with("action", action.to_string())
            .with("ok", result.is_ok());
        match result {
            Ok(value) => payload.insert("result_fp", Fingerprint::of_value(value)),
            Err(e) => payload.insert("error", e.to_string()),
        }
        audit.emit("tool_exec", payload);
    }
}

fn result_block(action: &Action, ok: bool, key: &str, value: Value) -> Block {
    let mut content = json!({
        "action": action.name,
        "params": action.params,
        "ok": ok,
    });
    if let Value::Object(map) = &mut content {
        map.insert(key.to_string(), value);
    }
    Block::new(content, TOOL_RESULT_BLOCK_TYPE)
}
