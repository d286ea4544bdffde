//! Error types for the audit trail

use thiserror::Error;

/// Audit errors
#[derive(Error, Debug)]
pub enum AuditError {
    /// Filesystem failure
    #[error("audit I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be encoded or decoded
    #[error("audit serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A line in an existing log is not an audit record
    #[error("malformed audit record at line {line}: {message}")]
    Malformed { line: usize, message: String },
}

pub type Result<T> = std::result::Result<T, AuditError>;
