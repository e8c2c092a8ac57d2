//! Clinic Sync Core Library
//!
//! Server side of the delta sync protocol between a central clinical record
//! store and intermittently connected clinic devices.
//!
//! # Architecture
//!
//! ```text
//!   Client push                                  Client pull (watermark)
//!       │                                                  │
//!       ▼                                                  ▼
//!  CallerResolver ──reject──▶ 4xx                    CallerResolver
//!       │                                                  │
//!  Sink::prepare (split body per record type)       PullRegistry
//!       │                                                  │
//!  ┌────▼────────────── one transaction ─────────────┐     │  per type:
//!  │ patients                                        │     │   created  (server_created_at > wm)
//!  │   → patient_additional_attributes               │     │   updated  (last_modified > wm)
//!  │   → visits → events → appointments              │     │   deleted  (deleted_at > wm)
//!  │   → prescriptions                               │     │
//!  │ transform → upsert / soft-delete (+ cascade)    │     ▼
//!  │ auto-repair: placeholder patient, null refs     │  { changes, timestamp }
//!  └────┬────────────────────────────────────────────┘
//!       │ commit, or roll back everything
//!       ▼
//!  { ok: true, timestamp }
//! ```
//!
//! # Modules
//!
//! - [`db`]: SQLite storage, schema and per-table upsert / soft-delete
//! - [`models`]: Record types (wire and normalized) and EAV values
//! - [`sync`]: Delta batches, watermarks, capabilities, the Sink, repair and cascade
//! - [`auth`]: Caller resolution contract
//! - [`config`]: Service configuration

pub mod auth;
pub mod config;
pub mod db;
pub mod models;
pub mod sync;

// Re-export commonly used types
pub use auth::{AuthError, CallerResolver, Credentials, Principal, StaticCallerResolver};
pub use config::SyncConfig;
pub use db::Database;
pub use models::{
    Appointment, AttributeMap, AttributeValue, ClinicalEvent, Patient, PatientAttribute,
    Prescription, Stored, Visit,
};
pub use sync::{
    ApplyStats, ChangeSet, DeltaBatch, PullRegistry, PushReport, RawDelta, Sink, SyncAction,
    SyncError, Watermark,
};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, info_span};
use uuid::Uuid;

// =========================================================================
// Error Type
// =========================================================================

#[derive(Debug, thiserror::Error)]
pub enum ClinicSyncError {
    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] AuthError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Database error: {0}")]
    Database(#[from] db::DbError),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

impl ClinicSyncError {
    /// Whether the request itself was at fault (4xx) rather than the
    /// server failing to apply it (5xx).
    pub fn is_client_error(&self) -> bool {
        match self {
            ClinicSyncError::Unauthorized(_) => true,
            ClinicSyncError::Sync(e) => e.is_client_error(),
            ClinicSyncError::Database(_) | ClinicSyncError::LockPoisoned(_) => false,
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for ClinicSyncError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        ClinicSyncError::LockPoisoned(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClinicSyncError>;

// =========================================================================
// Responses
// =========================================================================

/// Body returned by a pull.
#[derive(Debug, Serialize)]
pub struct PullResponse {
    pub changes: ChangeSet,
    /// Watermark for the client's next pull
    pub timestamp: Watermark,
}

/// Body returned by a successful push.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PushResponse {
    pub ok: bool,
    pub timestamp: Watermark,
}

// =========================================================================
// Service
// =========================================================================

/// The request handler: storage, both registries and the caller resolver.
///
/// Registries are built once and only read afterwards; all writes go
/// through the database lock, one push at a time.
pub struct SyncService {
    db: Arc<Mutex<Database>>,
    sink: Sink,
    pulls: PullRegistry,
    resolver: Arc<dyn CallerResolver>,
    config: SyncConfig,
}

impl SyncService {
    /// Service over an open database with the standard registries.
    pub fn new(db: Database, resolver: Arc<dyn CallerResolver>, config: SyncConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            sink: Sink::standard(),
            pulls: PullRegistry::standard(),
            resolver,
            config,
        }
    }

    /// Open the database named by `config` and build the service.
    pub fn open(config: SyncConfig, resolver: Arc<dyn CallerResolver>) -> Result<Self> {
        let db = Database::open_with_config(&config)?;
        Ok(Self::new(db, resolver, config))
    }

    /// Replace the push registry.
    pub fn with_sink(mut self, sink: Sink) -> Self {
        self.sink = sink;
        self
    }

    /// Replace the pull registry.
    pub fn with_pull_registry(mut self, pulls: PullRegistry) -> Self {
        self.pulls = pulls;
        self
    }

    /// Shared handle to the underlying database.
    pub fn database(&self) -> Arc<Mutex<Database>> {
        Arc::clone(&self.db)
    }

    /// Everything changed since the client's watermark.
    pub fn handle_pull(
        &self,
        credentials: &Credentials,
        watermark: Option<&Value>,
    ) -> Result<PullResponse> {
        let principal = self.resolver.resolve(credentials)?;
        let since = Watermark::parse(watermark).map_err(SyncError::from)?;

        let db = self.db.lock()?;
        // Pushes stamp rows only while holding the lock, so every row a
        // later push writes is newer than this. Backing off one
        // millisecond keeps a push in the same millisecond visible.
        let timestamp = Watermark::new(Utc::now() - Duration::milliseconds(1));
        let changes = self.pulls.pull(db.conn(), &since)?;

        debug!(
            user = %principal.user_id,
            since = %since,
            records = changes.values().map(RawDelta::size).sum::<usize>(),
            "pull served"
        );
        Ok(PullResponse { changes, timestamp })
    }

    /// Apply a client push atomically.
    pub fn handle_push(
        &self,
        credentials: &Credentials,
        watermark: Option<&Value>,
        body: Value,
    ) -> Result<PushResponse> {
        let (_, now) = self.apply_push(credentials, watermark, body, None)?;
        Ok(PushResponse {
            ok: true,
            timestamp: Watermark::new(now),
        })
    }

    /// [`handle_push`](Self::handle_push) with an explicit server clock.
    /// Returns the per-type counts.
    pub fn push_at(
        &self,
        credentials: &Credentials,
        watermark: Option<&Value>,
        body: Value,
        now: DateTime<Utc>,
    ) -> Result<PushReport> {
        let (report, _) = self.apply_push(credentials, watermark, body, Some(now))?;
        Ok(report)
    }

    /// Apply a push, reading the server clock (unless one is given) only
    /// once the database lock is held. Returns the counts and the time
    /// every written row was stamped with.
    fn apply_push(
        &self,
        credentials: &Credentials,
        watermark: Option<&Value>,
        body: Value,
        clock: Option<DateTime<Utc>>,
    ) -> Result<(PushReport, DateTime<Utc>)> {
        let principal = self.resolver.resolve(credentials)?;
        let watermark = Watermark::parse(watermark).map_err(SyncError::from)?;
        let Value::Object(body) = body else {
            return Err(SyncError::Malformed("push body must be a JSON object".to_string()).into());
        };

        let push_id = Uuid::new_v4();
        let span = info_span!("push", %push_id, user = %principal.user_id, %watermark);
        let _guard = span.enter();

        let prepared = self.sink.prepare(body)?;
        if let Some(max) = self.config.max_push_records {
            if prepared.size() > max {
                return Err(SyncError::Malformed(format!(
                    "push carries {} records, limit is {}",
                    prepared.size(),
                    max
                ))
                .into());
            }
        }

        let mut db = self.db.lock()?;
        let tx = db.transaction()?;
        let now = clock.unwrap_or_else(Utc::now);
        let report = self.sink.apply(tx, watermark, now, prepared)?;

        let total = report.total();
        info!(
            created = total.created,
            updated = total.updated,
            deleted = total.deleted,
            cascaded = total.cascaded,
            placeholders = total.placeholders,
            nulled_references = total.nulled_references,
            "push committed"
        );
        Ok((report, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn service() -> SyncService {
        let resolver = StaticCallerResolver::new().with_token(
            "tok",
            Principal {
                user_id: "u-1".to_string(),
                clinic_id: None,
            },
        );
        SyncService::new(
            Database::open_in_memory().unwrap(),
            Arc::new(resolver),
            SyncConfig::in_memory().with_max_push_records(2),
        )
    }

    fn token() -> Credentials {
        Credentials::Token("tok".to_string())
    }

    #[test]
    fn test_rejected_caller_is_client_error() {
        let err = service()
            .handle_pull(&Credentials::Token("nope".to_string()), Some(&json!(0)))
            .unwrap_err();
        assert!(matches!(err, ClinicSyncError::Unauthorized(_)));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_missing_watermark_is_client_error() {
        let err = service().handle_pull(&token(), None).unwrap_err();
        assert!(err.is_client_error());

        let err = service()
            .handle_push(&token(), Some(&json!("yesterday-ish")), json!({}))
            .unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_non_object_body_is_malformed() {
        let err = service()
            .handle_push(&token(), Some(&json!(0)), json!([1, 2, 3]))
            .unwrap_err();
        assert!(matches!(err, ClinicSyncError::Sync(SyncError::Malformed(_))));
    }

    #[test]
    fn test_push_record_limit() {
        let body = json!({"patients": {"created": [{"id": "a"}, {"id": "b"}, {"id": "c"}]}});
        let svc = service();
        let err = svc.handle_push(&token(), Some(&json!(0)), body).unwrap_err();
        assert!(err.is_client_error());

        let db = svc.database();
        assert_eq!(db.lock().unwrap().count_patients().unwrap(), 0);
    }

    #[test]
    fn test_apply_failure_is_server_error() {
        let body = json!({"patients": {"created": [{"given_name": "no id"}]}});
        let err = service()
            .handle_push(&token(), Some(&json!(0)), body)
            .unwrap_err();
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_push_response_shape() {
        let response = service()
            .handle_push(&token(), Some(&json!(0)), json!({}))
            .unwrap();
        let wire = serde_json::to_value(response).unwrap();
        assert_eq!(wire["ok"], true);
        assert!(wire["timestamp"].is_i64());
    }
}
