//! Raw item records as delivered by a source.
//!
//! Remote records are arbitrary JSON. [`RawItem`] wraps the value and offers
//! tolerant accessors; it is only ever read by the fetcher's normalizer.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One untyped item record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawItem(pub Value);

impl RawItem {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Top-level field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.0.get(name).filter(|v| !v.is_null())
    }

    /// Field of an expanded lookup, e.g. `("File", "Length")`.
    pub fn nested(&self, lookup: &str, name: &str) -> Option<&Value> {
        self.field(lookup)?.get(name).filter(|v| !v.is_null())
    }

    /// Top-level field as a non-empty string.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Top-level field rendered as text; numbers are accepted for ids.
    pub fn text_field(&self, name: &str) -> Option<String> {
        scalar_text(self.field(name)?)
    }
}

impl From<Value> for RawItem {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// String form of a scalar value. Objects, arrays and empty strings yield
/// `None`.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Non-negative integer from a number or a numeric string. Strings are
/// read up to the first non-digit, so `"1536.7"` yields 1536.
pub fn as_u64_lenient(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => {
            let s = s.trim_start();
            let s = s.strip_prefix('+').unwrap_or(s);
            let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
            s[..end].parse().ok()
        }
        _ => None,
    }
}
