use serde_json::Value;

use crate::db::{soft_delete, upsert_prescription, Table, Upserted};
use crate::models::{
    normalize_json, normalize_metadata, Prescription, PrescriptionDelta, DEFAULT_PRESCRIPTION_STATUS,
    DEFAULT_PRIORITY,
};
use crate::sync::{
    ensure_patient, optional_reference, SyncAction, SyncContext, SyncEntity, SyncResult,
};

use super::{business_times, optional_time};

/// `prescriptions`
pub struct Prescriptions;

impl SyncEntity for Prescriptions {
    const KEY: &'static str = "prescriptions";
    type Wire = PrescriptionDelta;
    type Record = Prescription;

    fn transform_delta(
        ctx: &mut SyncContext<'_>,
        _action: SyncAction,
        wire: PrescriptionDelta,
    ) -> SyncResult<Prescription> {
        let id = wire.id.as_str();
        let (created_at, updated_at) = business_times(
            ctx,
            Self::KEY,
            id,
            wire.created_at.as_ref(),
            wire.updated_at.as_ref(),
        );
        let prescribed_at = optional_time(Self::KEY, id, "prescribed_at", wire.prescribed_at.as_ref())
            .unwrap_or(created_at);
        let expiration_date =
            optional_time(Self::KEY, id, "expiration_date", wire.expiration_date.as_ref());
        let filled_at = optional_time(Self::KEY, id, "filled_at", wire.filled_at.as_ref());
        let items = match wire.items.map(normalize_json) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };
        let visit_id =
            optional_reference(ctx, Table::Visits, "visit_id", wire.visit_id, Self::KEY, &wire.id)?;

        Ok(Prescription {
            patient_id: wire.patient_id,
            provider_id: wire.provider_id,
            filled_by: wire.filled_by,
            pickup_clinic_id: wire.pickup_clinic_id,
            visit_id,
            priority: wire.priority.unwrap_or_else(|| DEFAULT_PRIORITY.to_string()),
            expiration_date,
            prescribed_at,
            filled_at,
            status: wire
                .status
                .unwrap_or_else(|| DEFAULT_PRESCRIPTION_STATUS.to_string()),
            items,
            notes: wire.notes.unwrap_or_default(),
            metadata: normalize_metadata(wire.metadata),
            created_at,
            updated_at,
            id: wire.id,
        })
    }

    fn create_from_delta(ctx: &mut SyncContext<'_>, record: &Prescription) -> SyncResult<Upserted> {
        ensure_patient(ctx, &record.patient_id, Self::KEY, &record.id)?;
        Ok(upsert_prescription(ctx.tx(), record, &ctx.now())?)
    }

    fn delete_from_delta(ctx: &mut SyncContext<'_>, id: &str) -> SyncResult<usize> {
        let deleted_at = ctx.watermark().as_datetime();
        Ok(soft_delete(ctx.tx(), Table::Prescriptions, id, &deleted_at, &ctx.now())?)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{apply, at};
    use super::*;
    use crate::db::Database;
    use serde_json::json;

    #[test]
    fn test_defaults_and_items() {
        let mut db = Database::open_in_memory().unwrap();
        apply::<Prescriptions>(
            &mut db,
            0,
            9_000,
            vec![json!({
                "id": "rx-1",
                "patient_id": "p-1",
                "created_at": 3_000,
                "updated_at": 3_000,
                "items": "[{\"medication\": \"amoxicillin\", \"dose\": 500, \"unit\": \"mg\"}]",
            })],
            vec![],
            vec![],
        );

        let rx = db.get_prescription("rx-1").unwrap().unwrap().record;
        assert_eq!(rx.priority, "normal");
        assert_eq!(rx.status, "pending");
        assert_eq!(rx.prescribed_at, at(3_000));
        assert_eq!(rx.items.len(), 1);
        assert_eq!(rx.items[0]["medication"], "amoxicillin");
        assert!(rx.filled_at.is_none());
    }
}
