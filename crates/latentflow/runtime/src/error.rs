//! Error types for the runtime

use std::path::PathBuf;

use latentflow_guard::{GuardViolation, InvariantViolation};
use thiserror::Error;

/// Why a transaction was rolled back.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConsumeError {
    /// A configured guard rule rejected the updated state
    #[error(transparent)]
    Guard(#[from] GuardViolation),

    /// An engineering invariant broke; this is a defect
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}

impl ConsumeError {
    pub fn code(&self) -> &str {
        match self {
            ConsumeError::Guard(v) => v.code(),
            ConsumeError::Invariant(v) => v.code(),
        }
    }

    /// True only for invariant failures.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ConsumeError::Invariant(_))
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Invalid [`ContinuousBuffer`](crate::ContinuousBuffer) construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("either a delimiter or a chunk size must be provided")]
    NoMode,

    #[error("choose either a delimiter or a chunk size, not both")]
    BothModes,

    #[error("chunk size must be positive")]
    ZeroChunk,

    #[error("delimiter must not be empty")]
    EmptyDelimiter,
}
