//! LatentFlow leaf types.
//!
//! Everything the decision runtime passes between layers is defined here:
//!
//! - **Block**: immutable, content-addressed unit of input/output. Its
//!   `block_id` doubles as the idempotency key for state updates.
//! - **IntentFrame**: the structured request produced by the language
//!   pipeline and wrapped in a Block of type `"intent"`.
//! - **Action / Plan**: named domain steps selected by the planner.
//! - **Violation**: the structured failure record (`code`, `message`,
//!   `meta`) shared by guards, policy checks and post-checks.
//! - **DecisionStatus**: the only user-visible outcome channel.

pub mod action;
pub mod block;
pub mod decision;
pub mod frame;
pub mod violation;

pub use action::{action_names, Action, Plan};
pub use block::{Block, BlockId, Fingerprint};
pub use decision::DecisionStatus;
pub use frame::{Constraint, ConstraintOp, FrameError, IntentFrame};
pub use violation::Violation;
