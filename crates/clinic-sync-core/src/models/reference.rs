//! Pull-only reference data, authored on the server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::value::Metadata;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Clinic {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Clinic {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Template for clinical event forms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventForm {
    pub id: String,
    pub name: String,
    pub description: String,
    pub language: String,
    pub is_editable: bool,
    pub is_snapshot_form: bool,
    pub form_fields: Value,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventForm {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            language: "en".to_string(),
            is_editable: true,
            is_snapshot_form: false,
            form_fields: Value::Array(Vec::new()),
            metadata: Metadata::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Template describing patient registration fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegistrationForm {
    pub id: String,
    pub name: String,
    pub fields: Value,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One translation of a localization string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StringContent {
    pub id: String,
    pub language: String,
    pub value: String,
}
