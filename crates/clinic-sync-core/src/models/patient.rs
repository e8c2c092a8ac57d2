//! Patient models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::value::{AttributeMap, Metadata};

/// Metadata key set on placeholder patients fabricated by auto-repair.
pub const ARTIFICIAL_FLAG: &str = "artificially_created";
/// Metadata key naming the record that caused the placeholder.
pub const ARTIFICIAL_SOURCE: &str = "artificially_created_from";

/// Patient as sent by a client.
#[derive(Debug, Clone, Deserialize)]
pub struct PatientDelta {
    pub id: String,
    pub given_name: Option<String>,
    pub surname: Option<String>,
    pub date_of_birth: Option<String>,
    pub citizenship: Option<String>,
    pub hometown: Option<String>,
    pub sex: Option<String>,
    pub phone: Option<String>,
    pub camp: Option<String>,
    pub government_id: Option<String>,
    pub external_patient_id: Option<String>,
    pub additional_data: Option<Value>,
    pub metadata: Option<Value>,
    pub photo_url: Option<String>,
    pub image_timestamp: Option<Value>,
    pub created_at: Option<Value>,
    pub updated_at: Option<Value>,
}

/// A patient record.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Patient {
    pub id: String,
    pub given_name: Option<String>,
    pub surname: Option<String>,
    pub date_of_birth: Option<String>,
    pub citizenship: Option<String>,
    pub hometown: Option<String>,
    pub sex: Option<String>,
    pub phone: Option<String>,
    pub camp: Option<String>,
    pub government_id: Option<String>,
    pub external_patient_id: Option<String>,
    /// Dynamic registration fields keyed by attribute id
    pub additional_data: AttributeMap,
    pub metadata: Metadata,
    pub photo_url: Option<String>,
    pub image_timestamp: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    /// Minimal patient standing in for a parent that a child record
    /// referenced before the parent itself arrived.
    pub fn placeholder(id: &str, source_key: &str, source_id: &str, now: DateTime<Utc>) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert(ARTIFICIAL_FLAG.to_string(), Value::Bool(true));
        metadata.insert(
            ARTIFICIAL_SOURCE.to_string(),
            json!({ "record_type": source_key, "id": source_id }),
        );

        Self {
            id: id.to_string(),
            given_name: None,
            surname: None,
            date_of_birth: None,
            citizenship: None,
            hometown: None,
            sex: None,
            phone: None,
            camp: None,
            government_id: None,
            external_patient_id: None,
            additional_data: AttributeMap::new(),
            metadata,
            photo_url: None,
            image_timestamp: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this row was fabricated by auto-repair.
    pub fn is_artificial(&self) -> bool {
        self.metadata
            .get(ARTIFICIAL_FLAG)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_is_flagged() {
        let now = Utc::now();
        let patient = Patient::placeholder("p-1", "events", "e-1", now);
        assert!(patient.is_artificial());
        assert_eq!(
            patient.metadata[ARTIFICIAL_SOURCE],
            json!({"record_type": "events", "id": "e-1"})
        );
        assert_eq!(patient.created_at, now);
    }

    #[test]
    fn test_wire_requires_id_only() {
        let delta: PatientDelta =
            serde_json::from_value(json!({"id": "p-1", "unknown_column": 3})).unwrap();
        assert_eq!(delta.id, "p-1");
        assert!(delta.given_name.is_none());

        let missing: Result<PatientDelta, _> = serde_json::from_value(json!({"given_name": "x"}));
        assert!(missing.is_err());
    }
}
