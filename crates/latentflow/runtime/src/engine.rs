use std::fmt;
use std::sync::Arc;

use latentflow_audit::{AuditPayload, AuditSink};
use latentflow_guard::StateGuard;
use latentflow_state::{effective_type_count, LatentState};
use latentflow_types::Block;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cost::CostCounter;
use crate::error::ConsumeError;
use crate::transaction::{incremental_update, ConsumeContext, ConsumeReceipt};

/// Decision reported when no plugin fires.
pub const NO_RULE_MATCHED: &str = "no rule matched";

/// A reasoning strategy over session state.
pub trait ReasonPlugin: Send + Sync {
    /// Name recorded in the reasoning trace.
    fn name(&self) -> &str;

    /// A decision, or `None` to defer to the next plugin.
    fn apply(&self, state: &LatentState) -> Option<String>;
}

/// Fires `"high activity"` once more than `threshold` blocks of
/// `block_type` have been seen.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRule {
    pub threshold: u64,
    pub block_type: String,
}

impl Default for ActivityRule {
    fn default() -> Self {
        Self::new(2)
    }
}

impl ActivityRule {
    pub fn new(threshold: u64) -> Self {
        Self {
            threshold,
            block_type: "event".to_string(),
        }
    }

    pub fn for_block_type(mut self, block_type: impl Into<String>) -> Self {
        self.block_type = block_type.into();
        self
    }
}

impl ReasonPlugin for ActivityRule {
    fn name(&self) -> &str {
        "ActivityRule"
    }

    fn apply(&self, state: &LatentState) -> Option<String> {
        (effective_type_count(state, &self.block_type) > self.threshold).then(|| "high activity".to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasonOutput {
    pub decision: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasonTrace {
    pub checked: Vec<String>,
    pub matched: Option<String>,
}

/// Consume + reason over one session's state.
///
/// Holds the safety configuration (guard, invariants) and the audit sink;
/// states are passed in, so one engine can serve many sessions.
#[derive(Default)]
pub struct Engine {
    guard: Option<StateGuard>,
    check_invariants: bool,
    audit: Option<Arc<dyn AuditSink>>,
    plugins: Vec<Box<dyn ReasonPlugin>>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("guard", &self.guard)
            .field("check_invariants", &self.check_invariants)
            .field("audit", &self.audit.is_some())
            .field("plugins", &self.plugins.iter().map(|p| p.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_guard(mut self, guard: StateGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn with_invariants(mut self, enabled: bool) -> Self {
        self.check_invariants = enabled;
        self
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn with_plugin<P: ReasonPlugin + 'static>(mut self, plugin: P) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    pub fn audit(&self) -> Option<&Arc<dyn AuditSink>> {
        self.audit.as_ref()
    }

    /// Run one consume transaction.
    pub fn consume(
        &self,
        state: &mut LatentState,
        block: Block,
        cost: &mut CostCounter,
    ) -> Result<ConsumeReceipt, ConsumeError> {
        let ctx = ConsumeContext {
            guard: self.guard.as_ref(),
            check_invariants: self.check_invariants,
            audit: self.audit.as_deref(),
        };
        incremental_update(state, block, cost, &ctx)
    }

    /// First plugin with an opinion wins.
    pub fn reason(&self, state: &LatentState) -> (ReasonOutput, ReasonTrace) {
        let mut trace = ReasonTrace::default();
        let mut decision = NO_RULE_MATCHED.to_string();

        for plugin in &self.plugins {
            trace.checked.push(plugin.name().to_string());
            if let Some(d) = plugin.apply(state) {
                trace.matched = Some(plugin.name().to_string());
                decision = d;
                break;
            }
        }

        debug!(decision = %decision, matched = ?trace.matched, "Reasoned over state");
        let output = ReasonOutput { decision };

        if let Some(audit) = &self.audit {
            audit.emit(
                "reason",
                AuditPayload::new()
                    .with("decision", &output)
                    .with("trace", &trace)
                    .with("state", state.summary()),
            );
        }

        (output, trace)
    }
}
