//! Tagged values exchanged with the graph engine
//!
//! The engine takes and returns `{ "type": <tag>, "value": <json> }` pairs.
//! The host side only ever deals in bare JSON values.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Result key the engine uses to report run cost. Never forwarded to the host.
pub const COST_KEY: &str = "cost";

/// Result keys with this prefix carry a JSON document whose fields are merged
/// into the output map.
pub const JSON_PREFIX: &str = "json";

/// Type tag of a [`TaggedValue`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DataType {
    String,
    Any,
    /// Any other tag the engine reports (`number`, `chat-message`, ...).
    Other(String),
}

impl DataType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::String => "string",
            Self::Any => "Any",
            Self::Other(tag) => tag,
        }
    }

    /// Tag for a value coming from the host: text is `string`, everything else `Any`.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::String(_) => Self::String,
            _ => Self::Any,
        }
    }
}

impl From<String> for DataType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "string" => Self::String,
            "Any" => Self::Any,
            _ => Self::Other(tag),
        }
    }
}

impl From<DataType> for String {
    fn from(tag: DataType) -> Self {
        match tag {
            DataType::Other(tag) => tag,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value in the engine's input/output shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedValue {
    #[serde(rename = "type")]
    pub data_type: DataType,
    pub value: Value,
}

impl TaggedValue {
    pub fn new(data_type: DataType, value: Value) -> Self {
        Self { data_type, value }
    }

    /// Wrap a host value, choosing the tag from its runtime type.
    pub fn wrap(value: Value) -> Self {
        Self {
            data_type: DataType::of(&value),
            value,
        }
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::new(DataType::String, Value::String(s.into()))
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

/// Slot id → tagged value handed to the processor.
pub type InputMap = IndexMap<String, TaggedValue>;

/// Output key → tagged value returned by the processor.
pub type ResultMap = IndexMap<String, TaggedValue>;

/// Flat key → value map published back to the host.
pub type OutputMap = IndexMap<String, Value>;
