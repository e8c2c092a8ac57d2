use crate::db::{soft_delete, upsert_patient, Table, Upserted};
use crate::models::{normalize_attribute_map, normalize_metadata, Patient, PatientDelta};
use crate::sync::{
    cascade_patient_delete, SyncAction, SyncContext, SyncEntity, SyncResult,
};

use super::{business_times, optional_time};

/// `patients`: the root of every ownership chain.
pub struct Patients;

impl SyncEntity for Patients {
    const KEY: &'static str = "patients";
    type Wire = PatientDelta;
    type Record = Patient;

    fn transform_delta(
        ctx: &mut SyncContext<'_>,
        _action: SyncAction,
        wire: PatientDelta,
    ) -> SyncResult<Patient> {
        let (created_at, updated_at) = business_times(
            ctx,
            Self::KEY,
            &wire.id,
            wire.created_at.as_ref(),
            wire.updated_at.as_ref(),
        );
        let image_timestamp =
            optional_time(Self::KEY, &wire.id, "image_timestamp", wire.image_timestamp.as_ref());

        Ok(Patient {
            given_name: wire.given_name,
            surname: wire.surname,
            date_of_birth: wire.date_of_birth,
            citizenship: wire.citizenship,
            hometown: wire.hometown,
            sex: wire.sex,
            phone: wire.phone,
            camp: wire.camp,
            government_id: wire.government_id,
            external_patient_id: wire.external_patient_id,
            additional_data: normalize_attribute_map(wire.additional_data),
            metadata: normalize_metadata(wire.metadata),
            photo_url: wire.photo_url,
            image_timestamp,
            created_at,
            updated_at,
            id: wire.id,
        })
    }

    fn create_from_delta(ctx: &mut SyncContext<'_>, record: &Patient) -> SyncResult<Upserted> {
        Ok(upsert_patient(ctx.tx(), record, &ctx.now())?)
    }

    fn delete_from_delta(ctx: &mut SyncContext<'_>, id: &str) -> SyncResult<usize> {
        let deleted_at = ctx.watermark().as_datetime();
        let rows = soft_delete(ctx.tx(), Table::Patients, id, &deleted_at, &ctx.now())?;
        cascade_patient_delete(ctx, id)?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{apply, at};
    use super::*;
    use crate::db::Database;
    use crate::models::AttributeValue;
    use serde_json::json;

    #[test]
    fn test_create_normalizes_wire_fields() {
        let mut db = Database::open_in_memory().unwrap();
        let stats = apply::<Patients>(
            &mut db,
            1_690_000_000_000,
            1_700_000_000_500,
            vec![json!({
                "id": "p-1",
                "given_name": "Amal",
                "created_at": 1_700_000_000_000_i64,
                "updated_at": "2023-11-14T22:13:20Z",
                "additional_data": "{\"height\": 160, \"insured\": true}",
                "metadata": null,
            })],
            vec![],
            vec![],
        );
        assert_eq!(stats.created, 1);

        let p = db.get_patient("p-1").unwrap().unwrap();
        assert_eq!(p.record.created_at, at(1_700_000_000_000));
        assert_eq!(p.record.updated_at, at(1_700_000_000_000));
        assert_eq!(
            p.record.additional_data.get("insured"),
            Some(&AttributeValue::Boolean(true))
        );
        assert!(p.record.metadata.is_empty());
        assert_eq!(p.lifecycle.server_created_at, at(1_700_000_000_500));
    }

    #[test]
    fn test_missing_timestamps_default_to_server_time() {
        let mut db = Database::open_in_memory().unwrap();
        apply::<Patients>(
            &mut db,
            0,
            1_700_000_000_000,
            vec![json!({"id": "p-1", "created_at": "not a time"})],
            vec![],
            vec![],
        );
        let p = db.get_patient("p-1").unwrap().unwrap();
        assert_eq!(p.record.created_at, at(1_700_000_000_000));
        assert_eq!(p.record.updated_at, at(1_700_000_000_000));
    }

    #[test]
    fn test_update_counts_and_keeps_server_created_at() {
        let mut db = Database::open_in_memory().unwrap();
        let record = json!({"id": "p-1", "given_name": "A", "created_at": 1, "updated_at": 1});
        apply::<Patients>(&mut db, 0, 1_000, vec![record], vec![], vec![]);

        let stats = apply::<Patients>(
            &mut db,
            0,
            2_000,
            vec![],
            vec![json!({"id": "p-1", "given_name": "B", "created_at": 1, "updated_at": 2})],
            vec![],
        );
        assert_eq!(stats.updated, 1);
        assert_eq!(stats.created, 0);

        let p = db.get_patient("p-1").unwrap().unwrap();
        assert_eq!(p.record.given_name.as_deref(), Some("B"));
        assert_eq!(p.lifecycle.server_created_at, at(1_000));
        assert_eq!(p.lifecycle.last_modified, at(2_000));
    }

    #[test]
    fn test_delete_is_stamped_with_watermark() {
        let mut db = Database::open_in_memory().unwrap();
        apply::<Patients>(&mut db, 0, 1_000, vec![json!({"id": "p-1"})], vec![], vec![]);
        let stats = apply::<Patients>(&mut db, 5_000, 6_000, vec![], vec![], vec!["p-1"]);
        assert_eq!(stats.deleted, 1);

        let p = db.get_patient("p-1").unwrap().unwrap();
        assert!(p.is_deleted());
        assert_eq!(p.lifecycle.deleted_at, Some(at(5_000)));
        assert_eq!(p.lifecycle.last_modified, at(6_000));
    }

    #[test]
    fn test_deleted_patient_is_not_revived() {
        let mut db = Database::open_in_memory().unwrap();
        apply::<Patients>(&mut db, 0, 1_000, vec![json!({"id": "p-1"})], vec![], vec!["p-1"]);
        apply::<Patients>(
            &mut db,
            0,
            2_000,
            vec![json!({"id": "p-1", "given_name": "Again"})],
            vec![],
            vec![],
        );

        let p = db.get_patient("p-1").unwrap().unwrap();
        assert!(p.is_deleted());
        assert_eq!(p.record.given_name.as_deref(), Some("Again"));
    }
}
