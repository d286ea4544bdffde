//! Audit trail.
//!
//! Every transaction, tool call and decision is recorded as one
//! self-describing JSON line carrying `ts`, `event`, a sequence number and a
//! hash linking it to the previous line. Audit is never consulted for
//! control flow: a failed write is logged and the caller carries on.

pub mod chain;
pub mod error;
pub mod record;
pub mod sink;

pub use chain::{verify_chain, verify_records, ChainReport, ChainState};
pub use error::{AuditError, Result};
pub use record::{AuditPayload, AuditRecord};
pub use sink::{AuditSink, JsonlAuditSink, MemoryAuditSink};
