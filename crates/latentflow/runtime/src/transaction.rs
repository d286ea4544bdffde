//! The consume transaction.
//!
//! ```text
//! START ─▶ UPDATED ─▶ GUARD_CHECKED ─▶ VERIFIED ─▶ COMMITTED
//!             │             │              │
//!             └─────────────┴──────────────┴──▶ ROLLED_BACK
//! ```

use latentflow_audit::{AuditPayload, AuditSink};
use latentflow_guard::{GuardTrace, Invariants, StateGuard};
use latentflow_state::{LatentState, StateDelta, UpdateOutcome};
use latentflow_types::{Block, BlockId, Fingerprint};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cost::CostCounter;
use crate::error::ConsumeError;

/// Collaborators of one transaction. Anything absent is skipped.
#[derive(Clone, Copy, Default)]
pub struct ConsumeContext<'a> {
    pub guard: Option<&'a StateGuard>,
    pub check_invariants: bool,
    pub audit: Option<&'a dyn AuditSink>,
}

/// Audit-safe reference to a consumed block: identity and fingerprint, no
/// content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRef {
    #[serde(rename = "type")]
    pub block_type: String,
    pub id: BlockId,
    pub fp: Fingerprint,
}

impl From<&Block> for BlockRef {
    fn from(block: &Block) -> Self {
        Self {
            block_type: block.block_type().to_string(),
            id: block.block_id().clone(),
            fp: block.fingerprint(),
        }
    }
}

/// Committed transaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConsumeReceipt {
    pub block: BlockRef,
    pub outcome: UpdateOutcome,
    pub delta: StateDelta,
    /// `None` when no guard is configured
    pub guard_trace: Option<GuardTrace>,
    /// Cost counters after this transaction
    pub cost: CostCounter,
}

/// Apply `block` to `state` as one atomic step.
///
/// On any failure the state is restored to its pre-call value, a
/// `consume_violation` audit event is emitted, and the original error is
/// returned. Cost counters record the attempt either way.
pub fn incremental_update(
    state: &mut LatentState,
    block: Block,
    cost: &mut CostCounter,
    ctx: &ConsumeContext<'_>,
) -> Result<ConsumeReceipt, ConsumeError> {
    let before = state.snapshot();
    let block_ref = BlockRef::from(&block);

    cost.add_ops(1);
    cost.add_bytes(block.content());
    let outcome = state.update(block);
    debug!(block_id = %block_ref.id, block_type = %block_ref.block_type, dedup = outcome.is_dedup(), "State updated");

    let checked = check(state, ctx);
    let guard_trace = match checked {
        Ok(trace) => trace,
        Err(err) => {
            state.rollback(before);
            if err.is_fatal() {
                tracing::error!(code = %err.code(), error = %err, "Invariant violated, transaction rolled back");
            } else {
                warn!(code = %err.code(), block_id = %block_ref.id, "Guard rejected update, transaction rolled back");
            }
            if let Some(audit) = ctx.audit {
                let mut payload = AuditPayload::new()
                    .with("block", &block_ref)
                    .with("code", err.code())
                    .with("error", err.to_string())
                    .with("fatal", err.is_fatal())
                    .with("state_after", state.summary())
                    .with("cost", *cost);
                if let ConsumeError::Guard(v) = &err {
                    payload.insert("guard_trace", &v.trace);
                }
                audit.emit("consume_violation", payload);
            }
            return Err(err);
        }
    };

    let delta = StateDelta::between(before.state(), state);

    if let Some(audit) = ctx.audit {
        if let Some(trace) = outcome.compression() {
            audit.emit(
                "compress",
                AuditPayload::new().with("block", &block_ref).with("trace", trace),
            );
        }
        audit.emit(
            "consume_ok",
            AuditPayload::new()
                .with("block", &block_ref)
                .with("outcome", &outcome)
                .with("delta", &delta)
                .with("guard_trace", &guard_trace)
                .with("state_after", state.summary())
                .with("cost", *cost),
        );
    }

    info!(
        block_id = %block_ref.id,
        steps = state.counter(),
        compressed = delta.compressed,
        "Transaction committed"
    );

    Ok(ConsumeReceipt {
        block: block_ref,
        outcome,
        delta,
        guard_trace,
        cost: *cost,
    })
}

fn check(state: &LatentState, ctx: &ConsumeContext<'_>) -> Result<Option<GuardTrace>, ConsumeError> {
    let guard_trace = match ctx.guard {
        Some(guard) => Some(guard.check(state)?),
        None => None,
    };
    if ctx.check_invariants {
        Invariants::check(state)?;
    }
    Ok(guard_trace)
}
