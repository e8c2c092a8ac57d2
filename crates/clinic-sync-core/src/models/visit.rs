//! Visit models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::value::Metadata;

#[derive(Debug, Clone, Deserialize)]
pub struct VisitDelta {
    pub id: String,
    pub patient_id: String,
    pub clinic_id: Option<String>,
    pub provider_id: Option<String>,
    pub provider_name: Option<String>,
    pub check_in_timestamp: Option<Value>,
    pub metadata: Option<Value>,
    pub created_at: Option<Value>,
    pub updated_at: Option<Value>,
}

/// A patient visit. Clinic and provider are weak references.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Visit {
    pub id: String,
    pub patient_id: String,
    pub clinic_id: Option<String>,
    pub provider_id: Option<String>,
    pub provider_name: Option<String>,
    pub check_in_timestamp: DateTime<Utc>,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
