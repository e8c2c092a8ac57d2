use crate::db::{soft_delete, upsert_visit, Table, Upserted};
use crate::models::{normalize_metadata, Visit, VisitDelta};
use crate::sync::{
    cascade_visit_delete, ensure_patient, SyncAction, SyncContext, SyncEntity, SyncResult,
};

use super::{business_times, optional_time};

/// `visits`
pub struct Visits;

impl SyncEntity for Visits {
    const KEY: &'static str = "visits";
    type Wire = VisitDelta;
    type Record = Visit;

    fn transform_delta(
        ctx: &mut SyncContext<'_>,
        _action: SyncAction,
        wire: VisitDelta,
    ) -> SyncResult<Visit> {
        let (created_at, updated_at) = business_times(
            ctx,
            Self::KEY,
            &wire.id,
            wire.created_at.as_ref(),
            wire.updated_at.as_ref(),
        );
        let check_in_timestamp = optional_time(
            Self::KEY,
            &wire.id,
            "check_in_timestamp",
            wire.check_in_timestamp.as_ref(),
        )
        .unwrap_or(created_at);

        Ok(Visit {
            patient_id: wire.patient_id,
            clinic_id: wire.clinic_id,
            provider_id: wire.provider_id,
            provider_name: wire.provider_name,
            check_in_timestamp,
            metadata: normalize_metadata(wire.metadata),
            created_at,
            updated_at,
            id: wire.id,
        })
    }

    fn create_from_delta(ctx: &mut SyncContext<'_>, record: &Visit) -> SyncResult<Upserted> {
        ensure_patient(ctx, &record.patient_id, Self::KEY, &record.id)?;
        Ok(upsert_visit(ctx.tx(), record, &ctx.now())?)
    }

    fn delete_from_delta(ctx: &mut SyncContext<'_>, id: &str) -> SyncResult<usize> {
        let deleted_at = ctx.watermark().as_datetime();
        let rows = soft_delete(ctx.tx(), Table::Visits, id, &deleted_at, &ctx.now())?;
        cascade_visit_delete(ctx, id)?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{apply, at};
    use super::*;
    use crate::db::Database;
    use crate::sync::{EntityCapability, PushCapability, RawDelta, SyncError, Watermark};
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn test_check_in_defaults_to_created_at() {
        let mut db = Database::open_in_memory().unwrap();
        apply::<Visits>(
            &mut db,
            0,
            9_000,
            vec![json!({"id": "v-1", "patient_id": "p-1", "provider_name": "Dr. Haddad",
                        "created_at": 4_000, "updated_at": 4_000})],
            vec![],
            vec![],
        );
        let visit = db.get_visit("v-1").unwrap().unwrap();
        assert_eq!(visit.record.check_in_timestamp, at(4_000));
        assert_eq!(visit.record.provider_name.as_deref(), Some("Dr. Haddad"));
    }

    #[test]
    fn test_missing_patient_id_is_invalid() {
        let mut db = Database::open_in_memory().unwrap();
        let tx = db.transaction().unwrap();
        let mut ctx = SyncContext::new(Watermark::now(), Utc::now(), &tx);
        let delta = RawDelta::from_parts(vec![json!({"id": "v-1"})], vec![], vec![]);

        let err = EntityCapability::<Visits>::new()
            .apply_delta_changes(&mut ctx, delta)
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidRecord { key: "visits", .. }));
    }
}
