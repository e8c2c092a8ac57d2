//! Appointment models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::value::Metadata;

/// Minutes, when the client leaves it out.
pub const DEFAULT_DURATION_MINUTES: i64 = 60;
pub const DEFAULT_APPOINTMENT_STATUS: &str = "pending";

#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentDelta {
    pub id: String,
    pub patient_id: String,
    pub provider_id: Option<String>,
    pub clinic_id: Option<String>,
    pub user_id: Option<String>,
    pub current_visit_id: Option<String>,
    // Older clients misspell this one.
    #[serde(alias = "fufilled_visit_id")]
    pub fulfilled_visit_id: Option<String>,
    #[serde(alias = "appointment_timestamp")]
    pub timestamp: Option<Value>,
    pub duration: Option<i64>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub status: Option<String>,
    pub metadata: Option<Value>,
    pub created_at: Option<Value>,
    pub updated_at: Option<Value>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    pub provider_id: Option<String>,
    pub clinic_id: Option<String>,
    pub user_id: Option<String>,
    /// Visit during which the appointment was booked
    pub current_visit_id: Option<String>,
    /// Visit that fulfilled the appointment
    pub fulfilled_visit_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub duration: i64,
    pub reason: String,
    pub notes: String,
    pub status: String,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
