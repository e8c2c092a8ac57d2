use serde_json::Value;

use crate::db::{soft_delete, upsert_event, Table, Upserted};
use crate::models::{normalize_json, normalize_metadata, ClinicalEvent, ClinicalEventDelta};
use crate::sync::{
    ensure_patient, optional_reference, SyncAction, SyncContext, SyncEntity, SyncResult,
};

use super::business_times;

/// `events`: form submissions.
pub struct Events;

impl SyncEntity for Events {
    const KEY: &'static str = "events";
    type Wire = ClinicalEventDelta;
    type Record = ClinicalEvent;

    fn transform_delta(
        ctx: &mut SyncContext<'_>,
        _action: SyncAction,
        wire: ClinicalEventDelta,
    ) -> SyncResult<ClinicalEvent> {
        let (created_at, updated_at) = business_times(
            ctx,
            Self::KEY,
            &wire.id,
            wire.created_at.as_ref(),
            wire.updated_at.as_ref(),
        );
        let visit_id =
            optional_reference(ctx, Table::Visits, "visit_id", wire.visit_id, Self::KEY, &wire.id)?;
        let form_id =
            optional_reference(ctx, Table::EventForms, "form_id", wire.form_id, Self::KEY, &wire.id)?;
        let form_data = match wire.form_data.map(normalize_json) {
            None | Some(Value::Null) => Value::Array(Vec::new()),
            Some(data) => data,
        };

        Ok(ClinicalEvent {
            patient_id: wire.patient_id,
            visit_id,
            form_id,
            event_type: wire.event_type.unwrap_or_default(),
            form_data,
            metadata: normalize_metadata(wire.metadata),
            created_at,
            updated_at,
            id: wire.id,
        })
    }

    fn create_from_delta(ctx: &mut SyncContext<'_>, record: &ClinicalEvent) -> SyncResult<Upserted> {
        ensure_patient(ctx, &record.patient_id, Self::KEY, &record.id)?;
        Ok(upsert_event(ctx.tx(), record, &ctx.now())?)
    }

    fn delete_from_delta(ctx: &mut SyncContext<'_>, id: &str) -> SyncResult<usize> {
        let deleted_at = ctx.watermark().as_datetime();
        Ok(soft_delete(ctx.tx(), Table::Events, id, &deleted_at, &ctx.now())?)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::apply;
    use super::*;
    use crate::db::Database;
    use crate::models::EventForm;
    use serde_json::json;

    #[test]
    fn test_unknown_visit_and_form_are_cleared() {
        let mut db = Database::open_in_memory().unwrap();
        let stats = apply::<Events>(
            &mut db,
            0,
            1_000,
            vec![json!({
                "id": "e-1",
                "patient_id": "p-1",
                "visit_id": "v-404",
                "form_id": "f-404",
                "event_type": "Vitals",
                "form_data": "[{\"name\": \"pulse\", \"value\": 71}]",
            })],
            vec![],
            vec![],
        );
        assert_eq!(stats.nulled_references, 2);
        assert_eq!(stats.placeholders, 1);

        let event = db.get_event("e-1").unwrap().unwrap();
        assert_eq!(event.record.visit_id, None);
        assert_eq!(event.record.form_id, None);
        assert_eq!(event.record.form_data[0]["value"], 71);
    }

    #[test]
    fn test_known_form_is_kept() {
        let mut db = Database::open_in_memory().unwrap();
        db.seed_event_form(&EventForm::new("f-1", "Vitals")).unwrap();
        apply::<Events>(
            &mut db,
            0,
            1_000,
            vec![json!({"id": "e-1", "patient_id": "p-1", "form_id": "f-1"})],
            vec![],
            vec![],
        );
        let event = db.get_event("e-1").unwrap().unwrap();
        assert_eq!(event.record.form_id.as_deref(), Some("f-1"));
        assert_eq!(event.record.form_data, json!([]));
        assert_eq!(event.record.event_type, "");
    }
}
