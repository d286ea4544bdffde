//! Audit sinks

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use tracing::warn;

use crate::chain::ChainState;
use crate::error::{AuditError, Result};
use crate::record::{AuditPayload, AuditRecord};

/// Destination for audit events.
///
/// Implementations are synchronous: the runtime core never suspends
/// mid-transaction.
pub trait AuditSink: Send + Sync {
    /// Seal and store one record.
    fn record(&self, event: &str, payload: AuditPayload) -> Result<AuditRecord>;

    /// Fire-and-forget emission; failures are logged, never returned.
    fn emit(&self, event: &str, payload: AuditPayload) {
        if let Err(e) = self.record(event, payload) {
            warn!(event, error = %e, "Audit write failed");
        }
    }
}

/// In-memory sink for tests and dry runs
#[derive(Default)]
pub struct MemoryAuditSink {
    state: RwLock<(ChainState, Vec<AuditRecord>)>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.state.read().1.clone()
    }

    /// Event names in emission order.
    pub fn events(&self) -> Vec<String> {
        self.state.read().1.iter().map(|r| r.event.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().1.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        *self.state.write() = (ChainState::new(), Vec::new());
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: &str, payload: AuditPayload) -> Result<AuditRecord> {
        let mut guard = self.state.write();
        let (chain, records) = &mut *guard;
        let record = AuditRecord::seal(event, payload, chain.next_seq(), chain.previous_hash())?;
        chain.advance(&record);
        records.push(record.clone());
        Ok(record)
    }
}

/// Append-only JSONL file sink, one record per line.
pub struct JsonlAuditSink {
    path: PathBuf,
    also_stdout: bool,
    chain: Mutex<ChainState>,
}

impl JsonlAuditSink {
    /// Open (or create) a log. An existing log is replayed so new records
    /// extend its chain.
    pub fn open(path: impl Into<PathBuf>, also_stdout: bool) -> Result<Self> {
        let path = path.into();
        let chain = if path.exists() {
            ChainState::load(&path)?
        } else {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            ChainState::new()
        };

        Ok(Self {
            path,
            also_stdout,
            chain: Mutex::new(chain),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record back from disk.
    pub fn read_all(&self) -> Result<Vec<AuditRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut records = Vec::new();
        for (line_no, line) in BufReader::new(File::open(&self.path)?).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line).map_err(|e| AuditError::Malformed {
                line: line_no + 1,
                message: e.to_string(),
            })?;
            records.push(record);
        }
        Ok(records)
    }
}

impl AuditSink for JsonlAuditSink {
    fn record(&self, event: &str, payload: AuditPayload) -> Result<AuditRecord> {
        // Hold the chain lock across the write so lines land in seq order.
        let mut chain = self.chain.lock();
        let record = AuditRecord::seal(event, payload, chain.next_seq(), chain.previous_hash())?;
        let line = record.to_line()?;

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        file.flush()?;

        if self.also_stdout {
            println!("{line}");
        }

        chain.advance(&record);
        Ok(record)
    }
}
