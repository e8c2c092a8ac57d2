//! Patient additional attributes (EAV rows).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::value::{AttributeValue, Metadata};

/// Attribute row as sent by a client: one value column is expected to be set.
#[derive(Debug, Clone, Deserialize)]
pub struct PatientAttributeDelta {
    pub id: String,
    pub patient_id: String,
    pub attribute_id: String,
    pub attribute: Option<String>,
    pub number_value: Option<f64>,
    pub string_value: Option<String>,
    pub date_value: Option<Value>,
    pub boolean_value: Option<bool>,
    pub metadata: Option<Value>,
    pub created_at: Option<Value>,
    pub updated_at: Option<Value>,
}

/// One value of one dynamic attribute for one patient.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PatientAttribute {
    pub id: String,
    pub patient_id: String,
    pub attribute_id: String,
    /// Human-readable attribute name
    pub attribute: String,
    pub value: Option<AttributeValue>,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
