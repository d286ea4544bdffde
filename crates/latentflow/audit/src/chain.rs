//! Hash-chain state and verification

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AuditError, Result};
use crate::record::AuditRecord;

/// Head of an audit chain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChainState {
    last_hash: Option<String>,
    next_seq: u64,
}

impl ChainState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(last_hash: Option<String>, next_seq: u64) -> Self {
        Self { last_hash, next_seq }
    }

    /// Recover the head from an existing log so appends continue the chain.
    pub fn load(path: &Path) -> Result<Self> {
        let mut state = Self::new();
        for (line_no, line) in BufReader::new(File::open(path)?).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: AuditRecord = serde_json::from_str(&line).map_err(|e| AuditError::Malformed {
                line: line_no + 1,
                message: e.to_string(),
            })?;
            state.advance(&record);
        }
        Ok(state)
    }

    pub fn previous_hash(&self) -> Option<&str> {
        self.last_hash.as_deref()
    }

    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    pub fn advance(&mut self, record: &AuditRecord) {
        self.last_hash = Some(record.chain.clone());
        self.next_seq = record.seq + 1;
    }
}

/// Outcome of replaying a chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainReport {
    pub valid: bool,
    pub total_records: usize,
    pub verified_records: usize,
    /// 1-based line (or record index + 1) of the first broken link
    pub first_invalid_line: Option<usize>,
    pub error_message: Option<String>,
}

impl ChainReport {
    fn broken(total: usize, verified: usize, line: usize, message: String) -> Self {
        Self {
            valid: false,
            total_records: total,
            verified_records: verified,
            first_invalid_line: Some(line),
            error_message: Some(message),
        }
    }
}

/// Check hashes and sequence numbers of records in log order.
pub fn verify_records(records: &[AuditRecord]) -> Result<ChainReport> {
    let total = records.len();
    let mut previous: Option<&str> = None;

    for (i, record) in records.iter().enumerate() {
        if record.seq != i as u64 {
            return Ok(ChainReport::broken(
                total,
                i,
                i + 1,
                format!("record {} has seq {}, expected {}", i + 1, record.seq, i),
            ));
        }
        let expected = record.compute_chain(previous)?;
        if expected != record.chain {
            return Ok(ChainReport::broken(
                total,
                i,
                i + 1,
                format!("record {} ({}) has a broken chain hash", i + 1, record.event),
            ));
        }
        previous = Some(record.chain.as_str());
    }

    Ok(ChainReport {
        valid: true,
        total_records: total,
        verified_records: total,
        first_invalid_line: None,
        error_message: None,
    })
}

/// Replay a JSONL audit log. Blank lines are skipped; a line that does not
/// parse as a record is reported as the first invalid line.
pub fn verify_chain(path: impl AsRef<Path>) -> Result<ChainReport> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let mut records = Vec::new();
    let mut line_numbers = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<AuditRecord>(&line) {
            Ok(record) => {
                records.push(record);
                line_numbers.push(line_no + 1);
            }
            Err(e) => {
                let report = verify_records(&records)?;
                if !report.valid {
                    return Ok(remap(report, &line_numbers));
                }
                return Ok(ChainReport::broken(
                    records.len() + 1,
                    records.len(),
                    line_no + 1,
                    format!("line {} is not an audit record: {e}", line_no + 1),
                ));
            }
        }
    }

    Ok(remap(verify_records(&records)?, &line_numbers))
}

/// Translate record positions into file line numbers.
fn remap(mut report: ChainReport, line_numbers: &[usize]) -> ChainReport {
    if let Some(idx) = report.first_invalid_line {
        if let Some(line) = line_numbers.get(idx - 1) {
            report.first_invalid_line = Some(*line);
        }
    }
    report
}
