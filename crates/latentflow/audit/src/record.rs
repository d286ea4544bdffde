//! Audit records and payloads

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Keys owned by the record envelope; payload entries using them are renamed.
const RESERVED_KEYS: &[&str] = &["ts", "event", "seq", "chain"];

/// Event-specific fields of an audit record.
///
/// Values are stored as JSON. Anything that cannot be serialized is recorded
/// by its `Debug` rendering instead of being dropped.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditPayload(BTreeMap<String, Value>);

impl AuditPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T>(mut self, key: impl Into<String>, value: T) -> Self
    where
        T: Serialize + fmt::Debug,
    {
        self.insert(key, value);
        self
    }

    pub fn insert<T>(&mut self, key: impl Into<String>, value: T)
    where
        T: Serialize + fmt::Debug,
    {
        let value = serde_json::to_value(&value).unwrap_or_else(|_| Value::String(format!("{value:?}")));
        self.insert_value(key.into(), value);
    }

    fn insert_value(&mut self, key: String, value: Value) {
        let key = if RESERVED_KEYS.contains(&key.as_str()) {
            format!("payload_{key}")
        } else {
            key
        };
        self.0.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<BTreeMap<String, Value>> for AuditPayload {
    fn from(map: BTreeMap<String, Value>) -> Self {
        let mut payload = Self::new();
        for (k, v) in map {
            payload.insert_value(k, v);
        }
        payload
    }
}

/// One line of the audit log.
///
/// Payload fields are flattened next to the envelope, so a line reads
/// `{"chain":..,"event":"consume_ok","seq":3,"ts":..,"delta":{..}}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub ts: DateTime<Utc>,
    pub event: String,
    pub seq: u64,
    /// blake3 over the previous record's chain hash and this record's body
    pub chain: String,
    #[serde(flatten)]
    pub payload: AuditPayload,
}

/// Hashed portion of a record: everything except `chain`.
#[derive(Serialize)]
struct RecordBody<'a> {
    ts: &'a DateTime<Utc>,
    event: &'a str,
    seq: u64,
    payload: &'a AuditPayload,
}

impl AuditRecord {
    /// Build a record linked to `previous` (None for the first record).
    pub fn seal(
        event: impl Into<String>,
        payload: AuditPayload,
        seq: u64,
        previous: Option<&str>,
    ) -> crate::Result<Self> {
        let mut record = Self {
            ts: Utc::now(),
            event: event.into(),
            seq,
            chain: String::new(),
            payload,
        };
        record.chain = record.compute_chain(previous)?;
        Ok(record)
    }

    /// Recompute the chain hash this record should carry.
    pub fn compute_chain(&self, previous: Option<&str>) -> crate::Result<String> {
        let body = serde_json::to_string(&RecordBody {
            ts: &self.ts,
            event: &self.event,
            seq: self.seq,
            payload: &self.payload,
        })?;
        let mut hasher = blake3::Hasher::new();
        hasher.update(previous.unwrap_or("").as_bytes());
        hasher.update(b"\n");
        hasher.update(body.as_bytes());
        Ok(hasher.finalize().to_hex().to_string())
    }

    pub fn to_line(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
