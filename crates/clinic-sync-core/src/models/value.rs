//! Dynamic values: EAV attribute values and loosely-typed JSON blobs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A single typed value of a dynamic attribute.
///
/// Untagged on the wire: booleans, numbers, RFC 3339 strings (dates) and
/// any other string (text). Arrays, objects and null (multi-select answers,
/// grouped fields) are kept as-is in `Json`; they only occur inside a
/// patient's `additional_data`, never in an attribute row. Variant order
/// matters for deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AttributeValue {
    Boolean(bool),
    Number(f64),
    Date(DateTime<Utc>),
    Text(String),
    Json(Value),
}

impl AttributeValue {
    /// Name of the attribute-row column this value lives in. `None` for
    /// `Json`, which has no column of its own.
    pub fn column(&self) -> Option<&'static str> {
        match self {
            AttributeValue::Boolean(_) => Some("boolean_value"),
            AttributeValue::Number(_) => Some("number_value"),
            AttributeValue::Date(_) => Some("date_value"),
            AttributeValue::Text(_) => Some("string_value"),
            AttributeValue::Json(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            AttributeValue::Date(d) => Some(*d),
            _ => None,
        }
    }
}

/// Ordered map from attribute id to value (patient `additional_data`).
pub type AttributeMap = BTreeMap<String, AttributeValue>;

/// Free-form metadata object.
pub type Metadata = Map<String, Value>;

/// Accept structured JSON or a JSON-encoded string and return structured
/// JSON. Strings that are not valid JSON are kept as plain strings.
pub fn normalize_json(value: Value) -> Value {
    match value {
        Value::String(s) => match serde_json::from_str::<Value>(&s) {
            Ok(parsed) => parsed,
            Err(_) => Value::String(s),
        },
        other => other,
    }
}

/// Normalize to a metadata object. Null and non-objects become `{}`.
pub fn normalize_metadata(value: Option<Value>) -> Metadata {
    match value.map(normalize_json) {
        Some(Value::Object(map)) => map,
        _ => Metadata::new(),
    }
}

impl From<Value> for AttributeValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Bool(b) => AttributeValue::Boolean(b),
            Value::Number(n) => match n.as_f64() {
                Some(f) => AttributeValue::Number(f),
                None => AttributeValue::Json(Value::Number(n)),
            },
            Value::String(s) => match s.parse::<DateTime<Utc>>() {
                Ok(at) => AttributeValue::Date(at),
                Err(_) => AttributeValue::Text(s),
            },
            other => AttributeValue::Json(other),
        }
    }
}

/// Normalize `additional_data` into an attribute map. Every entry is kept;
/// anything that is not an object (after decoding a JSON string) gives an
/// empty map.
pub fn normalize_attribute_map(value: Option<Value>) -> AttributeMap {
    let Some(Value::Object(map)) = value.map(normalize_json) else {
        return AttributeMap::new();
    };
    map.into_iter()
        .map(|(k, v)| (k, AttributeValue::from(v)))
        .collect()
}
