//! Pull registry: every record type a client can download.

use rusqlite::Connection;
use std::collections::BTreeMap;

use super::{PullCapability, RawDelta, SyncError, SyncResult, TablePull, Watermark};
use crate::db::{
    APPOINTMENTS, CLINICS, EVENTS, EVENT_FORMS, PATIENTS, PATIENT_ATTRIBUTES, PRESCRIPTIONS,
    REGISTRATION_FORMS, STRING_CONTENT, STRING_IDS, VISITS,
};

/// Changes keyed by record type, as sent back to the client.
pub type ChangeSet = BTreeMap<&'static str, RawDelta>;

#[derive(Default)]
pub struct PullRegistry {
    capabilities: Vec<Box<dyn PullCapability>>,
}

impl PullRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The syncable types plus the pull-only reference tables.
    pub fn standard() -> Self {
        let tables = [
            TablePull::new("patients", PATIENTS),
            TablePull::new("patient_additional_attributes", PATIENT_ATTRIBUTES),
            TablePull::new("visits", VISITS),
            TablePull::new("events", EVENTS),
            TablePull::new("appointments", APPOINTMENTS),
            TablePull::new("prescriptions", PRESCRIPTIONS),
            TablePull::new("clinics", CLINICS),
            TablePull::new("event_forms", EVENT_FORMS),
            TablePull::new("registration_forms", REGISTRATION_FORMS),
            TablePull::new("string_ids", STRING_IDS),
            TablePull::new("string_content", STRING_CONTENT),
        ];
        Self {
            capabilities: tables
                .into_iter()
                .map(|t| Box::new(t) as Box<dyn PullCapability>)
                .collect(),
        }
    }

    pub fn register(&mut self, capability: Box<dyn PullCapability>) -> SyncResult<()> {
        let key = capability.key();
        if self.capabilities.iter().any(|c| c.key() == key) {
            return Err(SyncError::DuplicateKey(key.to_string()));
        }
        self.capabilities.push(capability);
        Ok(())
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.capabilities.iter().map(|c| c.key())
    }

    /// Run every capability against `since`. Any storage failure fails the
    /// whole pull.
    pub fn pull(&self, conn: &Connection, since: &Watermark) -> SyncResult<ChangeSet> {
        self.capabilities
            .iter()
            .map(|c| Ok((c.key(), c.pull(conn, since)?)))
            .collect()
    }
}
