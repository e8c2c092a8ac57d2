//! The Sink: ordered push registry and transactional dispatcher.

use chrono::{DateTime, Utc};
use rusqlite::Transaction;
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use super::entities::{
    Appointments, Events, PatientAttributes, Patients, Prescriptions, Visits,
};
use super::{
    ApplyStats, EntityCapability, PushCapability, RawDelta, SyncContext, SyncError, SyncResult,
    Watermark,
};

/// Registered push capabilities, applied in registration order.
#[derive(Default)]
pub struct Sink {
    capabilities: Vec<Box<dyn PushCapability>>,
}

/// A push body split per registered record type, in apply order.
#[derive(Debug, Default)]
pub struct PreparedPush {
    batches: Vec<(&'static str, RawDelta)>,
}

impl PreparedPush {
    /// Records across every batch.
    pub fn size(&self) -> usize {
        self.batches.iter().map(|(_, delta)| delta.size()).sum()
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.batches.iter().map(|(key, _)| *key)
    }
}

/// Per-type counts of one applied push, in apply order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PushReport {
    pub per_type: Vec<(&'static str, ApplyStats)>,
}

impl PushReport {
    pub fn get(&self, key: &str) -> Option<&ApplyStats> {
        self.per_type
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, stats)| stats)
    }

    pub fn total(&self) -> ApplyStats {
        self.per_type
            .iter()
            .fold(ApplyStats::default(), |mut acc, (_, s)| {
                acc.created += s.created;
                acc.updated += s.updated;
                acc.deleted += s.deleted;
                acc.cascaded += s.cascaded;
                acc.placeholders += s.placeholders;
                acc.nulled_references += s.nulled_references;
                acc
            })
    }
}

impl Sink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The six syncable record types in foreign-key order: patients,
    /// attributes, visits, events, appointments, prescriptions.
    pub fn standard() -> Self {
        Self {
            capabilities: vec![
                Box::new(EntityCapability::<Patients>::new()),
                Box::new(EntityCapability::<PatientAttributes>::new()),
                Box::new(EntityCapability::<Visits>::new()),
                Box::new(EntityCapability::<Events>::new()),
                Box::new(EntityCapability::<Appointments>::new()),
                Box::new(EntityCapability::<Prescriptions>::new()),
            ],
        }
    }

    /// Append a capability after those already registered.
    pub fn register(&mut self, capability: Box<dyn PushCapability>) -> SyncResult<()> {
        let key = capability.key();
        if self.get(key).is_some() {
            return Err(SyncError::DuplicateKey(key.to_string()));
        }
        self.capabilities.push(capability);
        Ok(())
    }

    /// Unregister a record type.
    pub fn remove(&mut self, key: &str) -> Option<Box<dyn PushCapability>> {
        let idx = self.capabilities.iter().position(|c| c.key() == key)?;
        Some(self.capabilities.remove(idx))
    }

    pub fn get(&self, key: &str) -> Option<&dyn PushCapability> {
        self.capabilities
            .iter()
            .find(|c| c.key() == key)
            .map(|c| c.as_ref())
    }

    /// Registered keys in apply order.
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.capabilities.iter().map(|c| c.key())
    }

    /// Split a push body into typed batches, in apply order.
    ///
    /// Keys with no registered capability are logged and dropped. A value
    /// that is not a `{created, updated, deleted}` object is malformed.
    pub fn prepare(&self, mut body: Map<String, Value>) -> SyncResult<PreparedPush> {
        let mut batches = Vec::new();
        for key in self.keys() {
            let Some(raw) = body.remove(key) else {
                continue;
            };
            let delta: RawDelta = serde_json::from_value(raw)
                .map_err(|e| SyncError::Malformed(format!("{key}: {e}")))?;
            batches.push((key, delta));
        }

        for key in body.keys() {
            warn!(record_type = %key, "no push capability registered; ignoring");
        }

        Ok(PreparedPush { batches })
    }

    /// Apply a prepared push inside `tx`, committing only if every batch
    /// applies. On any failure the whole transaction is rolled back.
    pub fn apply(
        &self,
        tx: Transaction<'_>,
        watermark: Watermark,
        now: DateTime<Utc>,
        push: PreparedPush,
    ) -> SyncResult<PushReport> {
        let result = self.apply_all(&tx, watermark, now, push);
        match result {
            Ok(report) => {
                tx.commit()?;
                Ok(report)
            }
            Err(err) => {
                error!(error = %err, "push failed; rolling back");
                if let Err(rollback) = tx.rollback() {
                    error!(error = %rollback, "rollback failed");
                }
                Err(err)
            }
        }
    }

    fn apply_all(
        &self,
        tx: &Transaction<'_>,
        watermark: Watermark,
        now: DateTime<Utc>,
        push: PreparedPush,
    ) -> SyncResult<PushReport> {
        let mut ctx = SyncContext::new(watermark, now, tx);
        let mut report = PushReport::default();

        for (key, delta) in push.batches {
            let Some(capability) = self.get(key) else {
                continue;
            };
            capability.apply_delta_changes(&mut ctx, delta)?;
            let stats = ctx.take_stats();
            debug!(record_type = key, ?stats, "applied");
            report.per_type.push((key, stats));
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_standard_order() {
        let sink = Sink::standard();
        let keys: Vec<_> = sink.keys().collect();
        assert_eq!(
            keys,
            vec![
                "patients",
                "patient_additional_attributes",
                "visits",
                "events",
                "appointments",
                "prescriptions",
            ]
        );
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut sink = Sink::standard();
        let err = sink
            .register(Box::new(EntityCapability::<Visits>::new()))
            .unwrap_err();
        assert!(matches!(err, SyncError::DuplicateKey(key) if key == "visits"));
    }

    #[test]
    fn test_remove_then_register_moves_to_end() {
        let mut sink = Sink::standard();
        assert!(sink.remove("patients").is_some());
        assert!(sink.remove("patients").is_none());
        sink.register(Box::new(EntityCapability::<Patients>::new()))
            .unwrap();
        assert_eq!(sink.keys().last(), Some("patients"));
    }

    #[test]
    fn test_prepare_orders_and_drops_unknown_keys() {
        let sink = Sink::standard();
        let body = json!({
            "events": {"created": [{"id": "e-1"}]},
            "clinics": {"created": [{"id": "c-1"}]},
            "patients": {"deleted": ["p-1"]},
        });
        let Value::Object(body) = body else { unreachable!() };

        let prepared = sink.prepare(body).unwrap();
        assert_eq!(prepared.keys().collect::<Vec<_>>(), vec!["patients", "events"]);
        assert_eq!(prepared.size(), 2);
    }

    #[test]
    fn test_prepare_rejects_bad_shape() {
        let sink = Sink::standard();
        let Value::Object(body) = json!({"visits": "everything"}) else { unreachable!() };
        assert!(matches!(sink.prepare(body), Err(SyncError::Malformed(_))));
    }
}
