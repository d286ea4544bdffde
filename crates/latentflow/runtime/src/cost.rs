use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Work done on behalf of a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostCounter {
    /// State updates attempted
    pub operations: u64,
    /// Bytes of incoming payloads
    pub bytes_in: u64,
}

impl CostCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_ops(&mut self, n: u64) {
        self.operations += n;
    }

    /// Strings count their UTF-8 bytes, other payloads their JSON encoding;
    /// `null` counts nothing.
    pub fn add_bytes(&mut self, payload: &Value) {
        let len = match payload {
            Value::Null => 0,
            Value::String(s) => s.len(),
            other => other.to_string().len(),
        };
        self.bytes_in += len as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bytes_follow_payload_kind() {
        let mut cost = CostCounter::new();
        cost.add_bytes(&json!("héllo"));
        assert_eq!(cost.bytes_in, 6);
        cost.add_bytes(&Value::Null);
        assert_eq!(cost.bytes_in, 6);
        cost.add_bytes(&json!({"a": 1}));
        assert_eq!(cost.bytes_in, 6 + r#"{"a":1}"#.len() as u64);
    }
}
