//! Deterministic planning.
//!
//! Nothing in this crate samples, learns or mutates session state; the same
//! frame and state always yield the same plan and trace.
//!
//! - [`ActionSpace`]: per-intent candidate plans ([`TemplateActionSpace`]).
//! - [`CostModel`] / [`rank_plans`]: stable ascending ranking by heuristic cost.
//! - [`ConstrainedPlanner`]: verify, generate, rank, pick.
//! - [`SearchPlanner`]: breadth-first search over a caller-defined [`SearchDomain`].

pub mod action_space;
pub mod constrained;
pub mod heuristics;
pub mod search;

pub use action_space::{ActionSpace, TemplateActionSpace};
pub use constrained::{ConstrainedPlanner, PlanTrace, NO_PLAN};
pub use heuristics::{plan_cost, rank_plans, CostModel};
pub use search::{SearchDomain, SearchPlanner, SearchStats};
