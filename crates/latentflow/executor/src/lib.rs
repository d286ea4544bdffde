//! LatentFlow Executor - the tool boundary
//!
//! The executor runs planned actions through registered tools and turns
//! their results into `"tool_result"` blocks that are fed back into session
//! state. It has no decision-making authority: it runs whatever the planner
//! selected, one action at a time.

#![deny(unsafe_code)]

pub mod executor;
pub mod registry;

pub use executor::{ToolExecutor, ToolOutcome, TOOL_RESULT_BLOCK_TYPE};
pub use registry::{Tool, ToolError, ToolParams, ToolRegistry};

use thiserror::Error;

/// Executor errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("tool {tool} failed: {message}")]
    ToolFailed { tool: String, message: String },
}
