//! Safety rails over [`LatentState`](latentflow_state::LatentState).
//!
//! Two separate layers:
//!
//! - **StateGuard**: an ordered, configurable list of [`GuardRule`]s.
//!   Evaluation short-circuits on the first violation; the partial trace
//!   travels inside the returned [`GuardViolation`]. Guard failures are
//!   recoverable: the transaction rolls back and the caller carries on.
//! - **Invariants**: fixed correctness properties (count conservation,
//!   dedup bound). A failure here means a defect, not a user error, and is
//!   reported as fatal.

pub mod guard;
pub mod invariants;
pub mod rules;

pub use guard::{FailedRule, GuardTrace, GuardViolation, StateGuard};
pub use invariants::{InvariantViolation, Invariants};
pub use rules::GuardRule;
