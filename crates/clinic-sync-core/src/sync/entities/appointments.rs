use crate::db::{soft_delete, upsert_appointment, Table, Upserted};
use crate::models::{
    normalize_metadata, Appointment, AppointmentDelta, DEFAULT_APPOINTMENT_STATUS,
    DEFAULT_DURATION_MINUTES,
};
use crate::sync::{
    ensure_patient, optional_reference, SyncAction, SyncContext, SyncEntity, SyncResult,
};

use super::{business_times, required_time};

/// `appointments`
pub struct Appointments;

impl SyncEntity for Appointments {
    const KEY: &'static str = "appointments";
    type Wire = AppointmentDelta;
    type Record = Appointment;

    fn transform_delta(
        ctx: &mut SyncContext<'_>,
        _action: SyncAction,
        wire: AppointmentDelta,
    ) -> SyncResult<Appointment> {
        let (created_at, updated_at) = business_times(
            ctx,
            Self::KEY,
            &wire.id,
            wire.created_at.as_ref(),
            wire.updated_at.as_ref(),
        );
        let timestamp = required_time(ctx, Self::KEY, &wire.id, "timestamp", wire.timestamp.as_ref());
        let current_visit_id = optional_reference(
            ctx,
            Table::Visits,
            "current_visit_id",
            wire.current_visit_id,
            Self::KEY,
            &wire.id,
        )?;
        let fulfilled_visit_id = optional_reference(
            ctx,
            Table::Visits,
            "fulfilled_visit_id",
            wire.fulfilled_visit_id,
            Self::KEY,
            &wire.id,
        )?;

        Ok(Appointment {
            patient_id: wire.patient_id,
            provider_id: wire.provider_id,
            clinic_id: wire.clinic_id,
            user_id: wire.user_id,
            current_visit_id,
            fulfilled_visit_id,
            timestamp,
            duration: wire.duration.unwrap_or(DEFAULT_DURATION_MINUTES),
            reason: wire.reason.unwrap_or_default(),
            notes: wire.notes.unwrap_or_default(),
            status: wire
                .status
                .unwrap_or_else(|| DEFAULT_APPOINTMENT_STATUS.to_string()),
            metadata: normalize_metadata(wire.metadata),
            created_at,
            updated_at,
            id: wire.id,
        })
    }

    fn create_from_delta(ctx: &mut SyncContext<'_>, record: &Appointment) -> SyncResult<Upserted> {
        ensure_patient(ctx, &record.patient_id, Self::KEY, &record.id)?;
        Ok(upsert_appointment(ctx.tx(), record, &ctx.now())?)
    }

    fn delete_from_delta(ctx: &mut SyncContext<'_>, id: &str) -> SyncResult<usize> {
        let deleted_at = ctx.watermark().as_datetime();
        Ok(soft_delete(ctx.tx(), Table::Appointments, id, &deleted_at, &ctx.now())?)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{apply, at};
    use super::*;
    use crate::db::Database;
    use crate::sync::entities::Visits;
    use serde_json::json;

    #[test]
    fn test_defaults_and_legacy_field_names() {
        let mut db = Database::open_in_memory().unwrap();
        apply::<Visits>(
            &mut db,
            0,
            1_000,
            vec![json!({"id": "v-1", "patient_id": "p-1"})],
            vec![],
            vec![],
        );
        let stats = apply::<Appointments>(
            &mut db,
            0,
            2_000,
            vec![json!({
                "id": "ap-1",
                "patient_id": "p-1",
                "appointment_timestamp": 1_700_000_000_000_i64,
                "fufilled_visit_id": "v-1",
            })],
            vec![],
            vec![],
        );
        assert_eq!(stats.created, 1);
        assert_eq!(stats.placeholders, 0);

        let ap = db.get_appointment("ap-1").unwrap().unwrap().record;
        assert_eq!(ap.timestamp, at(1_700_000_000_000));
        assert_eq!(ap.fulfilled_visit_id.as_deref(), Some("v-1"));
        assert_eq!(ap.duration, 60);
        assert_eq!(ap.status, "pending");
        assert_eq!(ap.reason, "");
    }
}
