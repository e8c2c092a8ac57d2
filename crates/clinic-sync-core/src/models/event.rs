//! Clinical event models (form submissions).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::value::Metadata;

#[derive(Debug, Clone, Deserialize)]
pub struct ClinicalEventDelta {
    pub id: String,
    pub patient_id: String,
    pub visit_id: Option<String>,
    pub form_id: Option<String>,
    pub event_type: Option<String>,
    pub form_data: Option<Value>,
    pub metadata: Option<Value>,
    pub created_at: Option<Value>,
    pub updated_at: Option<Value>,
}

/// A form submission tied to a patient, optionally to a visit and a form.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ClinicalEvent {
    pub id: String,
    pub patient_id: String,
    pub visit_id: Option<String>,
    pub form_id: Option<String>,
    pub event_type: String,
    /// Submitted field entries, kept as the client shaped them
    pub form_data: Value,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
