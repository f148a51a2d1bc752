//! Helpers for reading loosely-shaped store values.
//!
//! Timestamps travel as epoch milliseconds; absent or malformed ones
//! normalize to the epoch so ordering stays total.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Epoch milliseconds for a timestamp.
pub fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

/// Timestamp from epoch milliseconds, clamped to the epoch on overflow.
pub fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or(DateTime::UNIX_EPOCH)
}

pub(crate) fn str_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub(crate) fn f64_field(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    obj.get(key).and_then(Value::as_f64)
}

pub(crate) fn ts_field(obj: &Map<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    obj.get(key).and_then(Value::as_i64).map(from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_millis_roundtrip() {
        let now = Utc::now();
        let back = from_millis(to_millis(now));
        assert_eq!(back.timestamp_millis(), now.timestamp_millis());
    }

    #[test]
    fn test_empty_strings_read_as_absent() {
        let value = json!({"note": "", "actor": "alice"});
        let obj = value.as_object().unwrap();
        assert_eq!(str_field(obj, "note"), None);
        assert_eq!(str_field(obj, "actor"), Some("alice".to_string()));
    }
}
