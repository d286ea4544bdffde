//! LatentFlow runtime.
//!
//! Ties the layers together into auditable transactions:
//!
//! ```text
//! intent block ─▶ incremental_update ─▶ ConstrainedPlanner ─▶ ToolExecutor
//!                  (update, guard,        (policy, constraints,   │ result blocks
//!                   invariants, rollback)  candidates, ranking)   ▼
//!                        ▲──────────────── incremental_update ◀───┘
//!                                                 │
//!                                  PostChecks ─▶ DecisionResult
//! ```
//!
//! Every step after the pre-transaction snapshot either commits or rolls the
//! state back before the failure is surfaced. Sessions are independent: one
//! [`MetaRuntime`] per session, any number of sessions in parallel.

pub mod config;
pub mod cost;
pub mod engine;
pub mod error;
pub mod input;
pub mod meta_runtime;
pub mod transaction;

pub use config::{AuditConfig, GuardConfig, InvariantsConfig, LoggingConfig, PlannerConfig, RuntimeConfig};
pub use cost::CostCounter;
pub use engine::{ActivityRule, Engine, ReasonOutput, ReasonPlugin, ReasonTrace, NO_RULE_MATCHED};
pub use error::{BufferError, ConfigError, ConsumeError};
pub use input::ContinuousBuffer;
pub use meta_runtime::{DecisionResult, DecisionTrace, ExecStep, MetaRuntime, PostCheckTrace};
pub use transaction::{incremental_update, BlockRef, ConsumeContext, ConsumeReceipt};
