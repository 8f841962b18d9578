//! Typed extras
//!
//! An ordered map of string keys to tagged values. Each top-level key is an
//! independent field when descriptors are merged.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::intent::Intent;
use crate::uri::Uri;

/// A single typed extra value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Bool(bool),
    Byte(i8),
    Short(i16),
    Char(char),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
    Blob(Vec<u8>),
    StrList(Vec<String>),
    Uri(Uri),
    Intent(Box<Intent>),
    Nested(Bundle),
}

impl Value {
    /// Type name used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Byte(_) => "byte",
            Value::Short(_) => "short",
            Value::Char(_) => "char",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Str(_) => "string",
            Value::Blob(_) => "blob",
            Value::StrList(_) => "string_list",
            Value::Uri(_) => "uri",
            Value::Intent(_) => "intent",
            Value::Nested(_) => "bundle",
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Uri> for Value {
    fn from(v: Uri) -> Self {
        Value::Uri(v)
    }
}

impl From<Bundle> for Value {
    fn from(v: Bundle) -> Self {
        Value::Nested(v)
    }
}

/// Ordered map of typed values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bundle {
    entries: IndexMap<String, Value>,
}

impl Bundle {
    /// Create an empty bundle
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value, returning the previous one
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.put(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove a key, keeping the order of the others
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.entries.get(key) {
            Some(Value::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn get_int(&self, key: &str) -> Option<i32> {
        match self.entries.get(key) {
            Some(Value::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_long(&self, key: &str) -> Option<i64> {
        match self.entries.get(key) {
            Some(Value::Long(v)) => Some(*v),
            Some(Value::Int(v)) => Some(i64::from(*v)),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.entries.get(key) {
            Some(Value::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_str_list(&self, key: &str) -> Option<&[String]> {
        match self.entries.get(key) {
            Some(Value::StrList(v)) => Some(v),
            _ => None,
        }
    }

    /// Copy keys from `other` that this bundle does not have yet.
    ///
    /// Returns the number of keys copied. Existing keys are never replaced.
    pub fn fill_missing_from(&mut self, other: &Bundle) -> usize {
        let mut copied = 0;
        for (key, value) in &other.entries {
            if !self.entries.contains_key(key) {
                self.entries.insert(key.clone(), value.clone());
                copied += 1;
            }
        }
        copied
    }
}

impl FromIterator<(String, Value)> for Bundle {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_accessors() {
        let bundle = Bundle::new()
            .with("name", "notes")
            .with("count", 3)
            .with("big", 5_000_000_000i64)
            .with("flag", true);

        assert_eq!(bundle.get_str("name"), Some("notes"));
        assert_eq!(bundle.get_int("count"), Some(3));
        assert_eq!(bundle.get_long("count"), Some(3));
        assert_eq!(bundle.get_long("big"), Some(5_000_000_000));
        assert_eq!(bundle.get_bool("flag"), Some(true));
        assert_eq!(bundle.get_int("name"), None);
    }

    #[test]
    fn test_fill_missing_never_overwrites() {
        let mut base = Bundle::new().with("a", 1);
        let template = Bundle::new().with("a", 2).with("b", 3);

        assert_eq!(base.fill_missing_from(&template), 1);
        assert_eq!(base.get_int("a"), Some(1));
        assert_eq!(base.get_int("b"), Some(3));
        assert_eq!(base.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut bundle = Bundle::new().with("x", 1).with("y", 2).with("z", 3);
        bundle.remove("y");
        assert_eq!(bundle.keys().collect::<Vec<_>>(), vec!["x", "z"]);
    }
}
