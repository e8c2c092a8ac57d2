//! SQLite schema definition.
//!
//! Every syncable table carries the same lifecycle columns:
//! `created_at`/`updated_at` (client business time), `server_created_at`
//! (first insert), `last_modified` (every write), and the soft-delete pair
//! `is_deleted`/`deleted_at`. All timestamps are fixed-width UTC text so
//! watermark comparisons can be done on the text.

/// Complete database schema for the clinic store.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id TEXT PRIMARY KEY,
    given_name TEXT,
    surname TEXT,
    date_of_birth TEXT,
    citizenship TEXT,
    hometown TEXT,
    sex TEXT,
    phone TEXT,
    camp TEXT,
    government_id TEXT,
    external_patient_id TEXT,
    additional_data TEXT NOT NULL DEFAULT '{}',   -- JSON object {attribute_id: value}
    metadata TEXT NOT NULL DEFAULT '{}',          -- JSON object
    photo_url TEXT,
    image_timestamp TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    server_created_at TEXT NOT NULL,
    last_modified TEXT NOT NULL,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    deleted_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_patients_server_created_at ON patients(server_created_at);
CREATE INDEX IF NOT EXISTS idx_patients_last_modified ON patients(last_modified);
CREATE INDEX IF NOT EXISTS idx_patients_deleted_at ON patients(deleted_at);

-- ============================================================================
-- Patient Additional Attributes (one row per patient per attribute)
-- ============================================================================

CREATE TABLE IF NOT EXISTS patient_additional_attributes (
    id TEXT NOT NULL,
    patient_id TEXT NOT NULL REFERENCES patients(id),
    attribute_id TEXT NOT NULL,
    attribute TEXT NOT NULL DEFAULT '',
    number_value REAL,
    string_value TEXT,
    date_value TEXT,
    boolean_value INTEGER,
    metadata TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    server_created_at TEXT NOT NULL,
    last_modified TEXT NOT NULL,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    deleted_at TEXT,
    PRIMARY KEY (patient_id, attribute_id)
);

CREATE INDEX IF NOT EXISTS idx_attributes_id ON patient_additional_attributes(id);
CREATE INDEX IF NOT EXISTS idx_attributes_server_created_at ON patient_additional_attributes(server_created_at);
CREATE INDEX IF NOT EXISTS idx_attributes_last_modified ON patient_additional_attributes(last_modified);

-- ============================================================================
-- Reference data (pull only)
-- ============================================================================

CREATE TABLE IF NOT EXISTS clinics (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    server_created_at TEXT NOT NULL,
    last_modified TEXT NOT NULL,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    deleted_at TEXT
);

CREATE TABLE IF NOT EXISTS event_forms (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    language TEXT NOT NULL DEFAULT 'en',
    is_editable INTEGER NOT NULL DEFAULT 1,
    is_snapshot_form INTEGER NOT NULL DEFAULT 0,
    form_fields TEXT NOT NULL DEFAULT '[]',       -- JSON array of field definitions
    metadata TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    server_created_at TEXT NOT NULL,
    last_modified TEXT NOT NULL,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    deleted_at TEXT
);

CREATE TABLE IF NOT EXISTS patient_registration_forms (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    fields TEXT NOT NULL DEFAULT '[]',            -- JSON array of field definitions
    metadata TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    server_created_at TEXT NOT NULL,
    last_modified TEXT NOT NULL,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    deleted_at TEXT
);

CREATE TABLE IF NOT EXISTS string_ids (
    id TEXT PRIMARY KEY,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    server_created_at TEXT NOT NULL,
    last_modified TEXT NOT NULL,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    deleted_at TEXT
);

CREATE TABLE IF NOT EXISTS string_content (
    id TEXT NOT NULL REFERENCES string_ids(id),
    language TEXT NOT NULL,
    value TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    server_created_at TEXT NOT NULL,
    last_modified TEXT NOT NULL,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    deleted_at TEXT,
    PRIMARY KEY (id, language)
);

-- ============================================================================
-- Visits
-- ============================================================================

CREATE TABLE IF NOT EXISTS visits (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id),
    clinic_id TEXT,                               -- weak reference
    provider_id TEXT,                             -- weak reference
    provider_name TEXT,
    check_in_timestamp TEXT NOT NULL,
    metadata TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    server_created_at TEXT NOT NULL,
    last_modified TEXT NOT NULL,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    deleted_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_visits_patient ON visits(patient_id);
CREATE INDEX IF NOT EXISTS idx_visits_server_created_at ON visits(server_created_at);
CREATE INDEX IF NOT EXISTS idx_visits_last_modified ON visits(last_modified);

-- ============================================================================
-- Events
-- ============================================================================

CREATE TABLE IF NOT EXISTS events (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id),
    visit_id TEXT REFERENCES visits(id),
    form_id TEXT REFERENCES event_forms(id),
    event_type TEXT NOT NULL DEFAULT '',
    form_data TEXT NOT NULL DEFAULT '[]',         -- JSON array of submitted fields
    metadata TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    server_created_at TEXT NOT NULL,
    last_modified TEXT NOT NULL,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    deleted_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_events_patient ON events(patient_id);
CREATE INDEX IF NOT EXISTS idx_events_visit ON events(visit_id);
CREATE INDEX IF NOT EXISTS idx_events_server_created_at ON events(server_created_at);
CREATE INDEX IF NOT EXISTS idx_events_last_modified ON events(last_modified);

-- ============================================================================
-- Appointments
-- ============================================================================

CREATE TABLE IF NOT EXISTS appointments (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id),
    provider_id TEXT,
    clinic_id TEXT,
    user_id TEXT,
    current_visit_id TEXT REFERENCES visits(id),
    fulfilled_visit_id TEXT REFERENCES visits(id),
    timestamp TEXT NOT NULL,
    duration INTEGER NOT NULL DEFAULT 60,         -- minutes
    reason TEXT NOT NULL DEFAULT '',
    notes TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT 'pending',
    metadata TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    server_created_at TEXT NOT NULL,
    last_modified TEXT NOT NULL,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    deleted_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_appointments_patient ON appointments(patient_id);
CREATE INDEX IF NOT EXISTS idx_appointments_current_visit ON appointments(current_visit_id);
CREATE INDEX IF NOT EXISTS idx_appointments_fulfilled_visit ON appointments(fulfilled_visit_id);
CREATE INDEX IF NOT EXISTS idx_appointments_server_created_at ON appointments(server_created_at);
CREATE INDEX IF NOT EXISTS idx_appointments_last_modified ON appointments(last_modified);

-- ============================================================================
-- Prescriptions
-- ============================================================================

CREATE TABLE IF NOT EXISTS prescriptions (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id),
    provider_id TEXT,
    filled_by TEXT,
    pickup_clinic_id TEXT,
    visit_id TEXT REFERENCES visits(id),
    priority TEXT NOT NULL DEFAULT 'normal',
    expiration_date TEXT,
    prescribed_at TEXT NOT NULL,
    filled_at TEXT,
    status TEXT NOT NULL DEFAULT 'pending',
    items TEXT NOT NULL DEFAULT '[]',             -- JSON array of medication items
    notes TEXT NOT NULL DEFAULT '',
    metadata TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    server_created_at TEXT NOT NULL,
    last_modified TEXT NOT NULL,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    deleted_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_prescriptions_patient ON prescriptions(patient_id);
CREATE INDEX IF NOT EXISTS idx_prescriptions_visit ON prescriptions(visit_id);
CREATE INDEX IF NOT EXISTS idx_prescriptions_server_created_at ON prescriptions(server_created_at);
CREATE INDEX IF NOT EXISTS idx_prescriptions_last_modified ON prescriptions(last_modified);
"#;
