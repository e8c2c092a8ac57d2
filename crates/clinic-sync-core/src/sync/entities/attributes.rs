use tracing::warn;

use crate::db::{soft_delete, upsert_patient_attribute, Table, Upserted};
use crate::models::{normalize_metadata, AttributeValue, PatientAttribute, PatientAttributeDelta};
use crate::sync::{ensure_patient, SyncAction, SyncContext, SyncEntity, SyncResult};

use super::{business_times, optional_time};

/// `patient_additional_attributes`: one typed value per patient and
/// attribute id.
pub struct PatientAttributes;

impl PatientAttributes {
    /// Pick the value column the client filled. If several are set the
    /// first in number, boolean, date, text order wins.
    fn pick_value(wire: &PatientAttributeDelta) -> Option<AttributeValue> {
        let date = optional_time(Self::KEY, &wire.id, "date_value", wire.date_value.as_ref());
        let candidates = [
            wire.number_value.map(AttributeValue::Number),
            wire.boolean_value.map(AttributeValue::Boolean),
            date.map(AttributeValue::Date),
            wire.string_value.clone().map(AttributeValue::Text),
        ];

        let mut present = candidates.into_iter().flatten();
        let value = present.next();
        if present.next().is_some() {
            warn!(
                record_type = Self::KEY,
                id = %wire.id,
                "several value columns set; keeping the first"
            );
        }
        value
    }
}

impl SyncEntity for PatientAttributes {
    const KEY: &'static str = "patient_additional_attributes";
    type Wire = PatientAttributeDelta;
    type Record = PatientAttribute;

    fn transform_delta(
        ctx: &mut SyncContext<'_>,
        _action: SyncAction,
        wire: PatientAttributeDelta,
    ) -> SyncResult<PatientAttribute> {
        let (created_at, updated_at) = business_times(
            ctx,
            Self::KEY,
            &wire.id,
            wire.created_at.as_ref(),
            wire.updated_at.as_ref(),
        );
        let value = Self::pick_value(&wire);

        Ok(PatientAttribute {
            attribute: wire.attribute.unwrap_or_default(),
            value,
            metadata: normalize_metadata(wire.metadata),
            created_at,
            updated_at,
            id: wire.id,
            patient_id: wire.patient_id,
            attribute_id: wire.attribute_id,
        })
    }

    fn create_from_delta(
        ctx: &mut SyncContext<'_>,
        record: &PatientAttribute,
    ) -> SyncResult<Upserted> {
        ensure_patient(ctx, &record.patient_id, Self::KEY, &record.id)?;
        Ok(upsert_patient_attribute(ctx.tx(), record, &ctx.now())?)
    }

    fn delete_from_delta(ctx: &mut SyncContext<'_>, id: &str) -> SyncResult<usize> {
        let deleted_at = ctx.watermark().as_datetime();
        Ok(soft_delete(ctx.tx(), Table::PatientAttributes, id, &deleted_at, &ctx.now())?)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{apply, at};
    use super::*;
    use crate::db::Database;
    use serde_json::json;

    #[test]
    fn test_typed_values_and_placeholder_parent() {
        let mut db = Database::open_in_memory().unwrap();
        let stats = apply::<PatientAttributes>(
            &mut db,
            0,
            1_000,
            vec![
                json!({"id": "a-1", "patient_id": "p-1", "attribute_id": "height",
                       "attribute": "Height", "number_value": 162.0}),
                json!({"id": "a-2", "patient_id": "p-1", "attribute_id": "last_seen",
                       "date_value": 1_700_000_000_000_i64}),
            ],
            vec![],
            vec![],
        );
        assert_eq!(stats.created, 2);
        assert_eq!(stats.placeholders, 1);

        let height = db.get_patient_attribute("p-1", "height").unwrap().unwrap();
        assert_eq!(height.record.value, Some(AttributeValue::Number(162.0)));
        assert_eq!(height.record.attribute, "Height");

        let seen = db.get_patient_attribute("p-1", "last_seen").unwrap().unwrap();
        assert_eq!(
            seen.record.value,
            Some(AttributeValue::Date(at(1_700_000_000_000)))
        );
        assert!(db.get_patient("p-1").unwrap().unwrap().record.is_artificial());
    }

    #[test]
    fn test_delete_by_row_id() {
        let mut db = Database::open_in_memory().unwrap();
        apply::<PatientAttributes>(
            &mut db,
            0,
            1_000,
            vec![json!({"id": "a-1", "patient_id": "p-1", "attribute_id": "x",
                        "string_value": "yes"})],
            vec![],
            vec![],
        );
        let stats = apply::<PatientAttributes>(&mut db, 2_000, 3_000, vec![], vec![], vec!["a-1"]);
        assert_eq!(stats.deleted, 1);

        let row = db.get_patient_attribute("p-1", "x").unwrap().unwrap();
        assert!(row.is_deleted());
        assert_eq!(row.lifecycle.deleted_at, Some(at(2_000)));
    }
}
