//! Decision modulators.
//!
//! These modules only shape thresholds and bookkeeping around a decision;
//! none of them can approve or reject an action on its own.
//!
//! - [`AffectState`]: confidence / risk / fatigue, producing the
//!   `conservatism` knob that picks NEED_CLARIFICATION over DENY.
//! - [`LearningStats`]: per-intent and per-action outcome counts.
//! - [`CausalMemory`]: bounded `(context, plan) -> outcome` records.
//! - [`Reflector`]: failure classification by message text.

pub mod affect;
pub mod causal;
pub mod learning;
pub mod reflection;

pub use affect::{AffectKnobs, AffectState};
pub use causal::{CausalMemory, CausalRecord};
pub use learning::{LearningHeuristics, LearningStats};
pub use reflection::{FailureKind, Reflection, Reflector};
