//! [`SyncEntity`](super::SyncEntity) implementations, one per syncable
//! record type, plus the wire-normalization helpers they share.

mod appointments;
mod attributes;
mod events;
mod patients;
mod prescriptions;
mod visits;

pub use appointments::Appointments;
pub use attributes::PatientAttributes;
pub use events::Events;
pub use patients::Patients;
pub use prescriptions::Prescriptions;
pub use visits::Visits;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::warn;

use super::{parse_timestamp, SyncContext, TimestampError};

/// A business timestamp that should be present. Missing or unparsable
/// values fall back to the push's server time.
pub(crate) fn required_time(
    ctx: &SyncContext<'_>,
    record_type: &'static str,
    id: &str,
    field: &'static str,
    value: Option<&Value>,
) -> DateTime<Utc> {
    match value.map(parse_timestamp) {
        Some(Ok(at)) => at,
        None | Some(Err(TimestampError::Missing)) => {
            warn!(record_type, id, field, "timestamp missing; using server time");
            ctx.now()
        }
        Some(Err(err)) => {
            warn!(record_type, id, field, error = %err, "bad timestamp; using server time");
            ctx.now()
        }
    }
}

/// A timestamp that may legitimately be absent. Unparsable values are
/// dropped with a warning.
pub(crate) fn optional_time(
    record_type: &'static str,
    id: &str,
    field: &'static str,
    value: Option<&Value>,
) -> Option<DateTime<Utc>> {
    match value.map(parse_timestamp) {
        Some(Ok(at)) => Some(at),
        None | Some(Err(TimestampError::Missing)) => None,
        Some(Err(err)) => {
            warn!(record_type, id, field, error = %err, "bad timestamp; dropped");
            None
        }
    }
}

/// Created/updated pair, each falling back to server time.
pub(crate) fn business_times(
    ctx: &SyncContext<'_>,
    record_type: &'static str,
    id: &str,
    created_at: Option<&Value>,
    updated_at: Option<&Value>,
) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        required_time(ctx, record_type, id, "created_at", created_at),
        required_time(ctx, record_type, id, "updated_at", updated_at),
    )
}

#[cfg(test)]
pub(crate) mod testing {
    use super::super::{EntityCapability, PushCapability, RawDelta, SyncContext, SyncEntity};
    use crate::db::Database;
    use crate::sync::{ApplyStats, Watermark};
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::Value;

    pub fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    /// Apply one batch for `E` in its own committed transaction.
    pub fn apply<E: SyncEntity>(
        db: &mut Database,
        watermark_ms: i64,
        now_ms: i64,
        created: Vec<Value>,
        updated: Vec<Value>,
        deleted: Vec<&str>,
    ) -> ApplyStats {
        let tx = db.transaction().unwrap();
        let mut ctx = SyncContext::new(
            Watermark::from_millis(watermark_ms).unwrap(),
            at(now_ms),
            &tx,
        );
        let delta = RawDelta::from_parts(
            created,
            updated,
            deleted.into_iter().map(String::from).collect(),
        );
        EntityCapability::<E>::new()
            .apply_delta_changes(&mut ctx, delta)
            .unwrap();
        let stats = ctx.take_stats();
        drop(ctx);
        tx.commit().unwrap();
        stats
    }
}
