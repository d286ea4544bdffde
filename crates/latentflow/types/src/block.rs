use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Number of hex characters kept from the content hash.
const BLOCK_ID_HEX_LEN: usize = 16;
const FINGERPRINT_HEX_LEN: usize = 8;

/// Stable content hash over `block_type` + `content`.
///
/// Two blocks with the same type and structurally equal content always get
/// the same id, which is what makes re-delivery detectable.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    /// Derive the id from type and content.
    ///
    /// `serde_json::Value` keeps object keys sorted, so the rendered JSON is
    /// canonical for a given structure.
    pub fn derive(block_type: &str, content: &Value) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(block_type.as_bytes());
        hasher.update(b":");
        hasher.update(content.to_string().as_bytes());
        let hex = hasher.finalize().to_hex();
        Self(hex[..BLOCK_ID_HEX_LEN].to_string())
    }

    /// Wrap an externally supplied idempotency key.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An immutable unit of input or output.
///
/// Fields are private: once constructed a Block never changes. States hold
/// blocks behind `Arc`, so sharing is read-only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    content: Value,
    block_type: String,
    block_id: BlockId,
    timestamp: DateTime<Utc>,
}

impl Block {
    /// Create a block whose id is derived from its type and content.
    pub fn new(content: Value, block_type: impl Into<String>) -> Self {
        let block_type = block_type.into();
        let block_id = BlockId::derive(&block_type, &content);
        Self {
            content,
            block_type,
            block_id,
            timestamp: Utc::now(),
        }
    }

    /// Create a block of the default `"event"` type.
    pub fn event(content: Value) -> Self {
        Self::new(content, "event")
    }

    /// Create a block with a caller-chosen idempotency key.
    pub fn with_id(content: Value, block_type: impl Into<String>, block_id: BlockId) -> Self {
        Self {
            content,
            block_type: block_type.into(),
            block_id,
            timestamp: Utc::now(),
        }
    }

    pub fn content(&self) -> &Value {
        &self.content
    }

    pub fn block_type(&self) -> &str {
        &self.block_type
    }

    pub fn block_id(&self) -> &BlockId {
        &self.block_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Size/digest summary of the content, safe to put in audit records.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of_value(&self.content)
    }
}

/// Length and short digest of a payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub len: usize,
    pub digest: String,
}

impl Fingerprint {
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let hex = blake3::hash(bytes).to_hex();
        Self {
            len: bytes.len(),
            digest: hex[..FINGERPRINT_HEX_LEN].to_string(),
        }
    }

    /// Strings are measured by their UTF-8 bytes, anything else by its JSON
    /// encoding.
    pub fn of_value(value: &Value) -> Self {
        match value {
            Value::String(s) => Self::of_bytes(s.as_bytes()),
            other => Self::of_bytes(other.to_string().as_bytes()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn id_is_stable_for_equal_content() {
        let a = Block::new(json!({"b": 2, "a": 1}), "event");
        let b = Block::new(json!({"a": 1, "b": 2}), "event");
        assert_eq!(a.block_id(), b.block_id());
        assert_eq!(a.block_id().as_str().len(), 16);
    }

    #[test]
    fn id_depends_on_type() {
        let a = Block::new(json!("x"), "event");
        let b = Block::new(json!("x"), "intent");
        assert_ne!(a.block_id(), b.block_id());
    }

    #[test]
    fn explicit_id_is_kept() {
        let block = Block::with_id(json!(1), "event", BlockId::new("k-1"));
        assert_eq!(block.block_id().as_str(), "k-1");
    }

    #[test]
    fn fingerprint_measures_utf8_bytes() {
        let fp = Fingerprint::of_value(&json!("héllo"));
        assert_eq!(fp.len, 6);
        assert_eq!(fp.digest.len(), 8);
    }
}
