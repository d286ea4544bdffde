//! Loose comparisons over JSON slot values.

use serde_json::Value;

/// Numbers as-is, numeric strings parsed; anything else is not a number.
pub(crate) fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Absent, null, false, zero, or an empty string/array/object.
pub(crate) fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => !b,
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(a)) => a.is_empty(),
        Some(Value::Object(o)) => o.is_empty(),
    }
}

/// Equality where `500` and `500.0` compare equal.
pub(crate) fn loosely_equal(current: Option<&Value>, expected: &Value) -> bool {
    let current = current.unwrap_or(&Value::Null);
    match (current, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (a, b) => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_strings_parse() {
        assert_eq!(as_number(&json!("12.5")), Some(12.5));
        assert_eq!(as_number(&json!("abc")), None);
        assert_eq!(as_number(&json!(true)), None);
    }

    #[test]
    fn emptiness_follows_truthiness() {
        assert!(is_empty(None));
        assert!(is_empty(Some(&json!(""))));
        assert!(is_empty(Some(&json!(0))));
        assert!(!is_empty(Some(&json!("x"))));
    }

    #[test]
    fn integer_equals_float() {
        assert!(loosely_equal(Some(&json!(500)), &json!(500.0)));
        assert!(loosely_equal(None, &Value::Null));
        assert!(!loosely_equal(Some(&json!("a")), &json!("b")));
    }
}
