//! Document identifiers and their engine-side textual form.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{Error, Result};

/// A document key as the caller holds it.
///
/// Only strings, 32/64-bit signed integers and UUIDs are keys. Anything else
/// is rejected when converting from a dynamic value. Deserialized strings
/// stay strings even when they look like a UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum DocumentKey {
    Int32(i32),
    Int64(i64),
    Uuid(Uuid),
    String(String),
}

/// The engine's native key: always the textual rendering of a [`DocumentKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EngineKey(String);

impl EngineKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for EngineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl DocumentKey {
    /// Render the key the way the engine stores it. UUIDs use the lowercase
    /// hyphenated form, integers their decimal form, strings are unchanged.
    pub fn normalize(&self) -> EngineKey {
        let text = match self {
            DocumentKey::Int32(v) => v.to_string(),
            DocumentKey::Int64(v) => v.to_string(),
            DocumentKey::Uuid(v) => v.hyphenated().to_string(),
            DocumentKey::String(v) => v.clone(),
        };
        EngineKey(text)
    }
}

impl From<i32> for DocumentKey {
    fn from(v: i32) -> Self {
        DocumentKey::Int32(v)
    }
}

impl From<i64> for DocumentKey {
    fn from(v: i64) -> Self {
        DocumentKey::Int64(v)
    }
}

impl From<Uuid> for DocumentKey {
    fn from(v: Uuid) -> Self {
        DocumentKey::Uuid(v)
    }
}

impl From<String> for DocumentKey {
    fn from(v: String) -> Self {
        DocumentKey::String(v)
    }
}

impl From<&str> for DocumentKey {
    fn from(v: &str) -> Self {
        DocumentKey::String(v.to_string())
    }
}

impl TryFrom<&serde_json::Value> for DocumentKey {
    type Error = Error;

    fn try_from(value: &serde_json::Value) -> Result<Self> {
        use serde_json::Value;
        match value {
            Value::String(s) => Ok(DocumentKey::String(s.clone())),
            Value::Number(n) => match n.as_i64() {
                Some(v) => Ok(i32::try_from(v).map_or(DocumentKey::Int64(v), DocumentKey::Int32)),
                None if n.is_u64() => Err(Error::UnsupportedKeyType(format!(
                    "integer {n} does not fit a signed 64-bit key"
                ))),
                None => Err(Error::UnsupportedKeyType(format!("floating point value {n}"))),
            },
            Value::Null => Err(Error::UnsupportedKeyType("null".to_string())),
            Value::Bool(b) => Err(Error::UnsupportedKeyType(format!("boolean {b}"))),
            Value::Array(_) => Err(Error::UnsupportedKeyType("array".to_string())),
            Value::Object(_) => Err(Error::UnsupportedKeyType("object".to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for DocumentKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        DocumentKey::try_from(&value).map_err(serde::de::Error::custom)
    }
}

impl TryFrom<serde_json::Value> for DocumentKey {
    type Error = Error;

    fn try_from(value: serde_json::Value) -> Result<Self> {
        DocumentKey::try_from(&value)
    }
}
