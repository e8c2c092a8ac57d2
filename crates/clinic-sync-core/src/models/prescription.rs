//! Prescription models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::value::Metadata;

pub const DEFAULT_PRIORITY: &str = "normal";
pub const DEFAULT_PRESCRIPTION_STATUS: &str = "pending";

#[derive(Debug, Clone, Deserialize)]
pub struct PrescriptionDelta {
    pub id: String,
    pub patient_id: String,
    pub provider_id: Option<String>,
    pub filled_by: Option<String>,
    pub pickup_clinic_id: Option<String>,
    pub visit_id: Option<String>,
    pub priority: Option<String>,
    pub expiration_date: Option<Value>,
    pub prescribed_at: Option<Value>,
    pub filled_at: Option<Value>,
    pub status: Option<String>,
    pub items: Option<Value>,
    pub notes: Option<String>,
    pub metadata: Option<Value>,
    pub created_at: Option<Value>,
    pub updated_at: Option<Value>,
}

/// A prescription with its medication line items.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Prescription {
    pub id: String,
    pub patient_id: String,
    pub provider_id: Option<String>,
    pub filled_by: Option<String>,
    pub pickup_clinic_id: Option<String>,
    pub visit_id: Option<String>,
    pub priority: String,
    pub expiration_date: Option<DateTime<Utc>>,
    pub prescribed_at: DateTime<Utc>,
    pub filled_at: Option<DateTime<Utc>>,
    pub status: String,
    /// Medication items, each an object shaped by the client
    pub items: Vec<Value>,
    pub notes: String,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
