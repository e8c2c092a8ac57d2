//! Patient additional attribute (EAV) database operations.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::changes::{Column, ColumnKind, TableSpec};
use super::lifecycle::{get_json, get_lifecycle, get_opt_ts, get_ts, sql_opt_ts, sql_ts, Table, Upserted};
use super::{Database, DbResult};
use crate::models::{AttributeValue, PatientAttribute, Stored};

pub const PATIENT_ATTRIBUTES: TableSpec = TableSpec {
    table: Table::PatientAttributes,
    columns: &[
        Column::new("id", ColumnKind::Text),
        Column::new("patient_id", ColumnKind::Text),
        Column::new("attribute_id", ColumnKind::Text),
        Column::new("attribute", ColumnKind::Text),
        Column::new("number_value", ColumnKind::Real),
        Column::new("string_value", ColumnKind::Text),
        Column::new("date_value", ColumnKind::Timestamp),
        Column::new("boolean_value", ColumnKind::Bool),
        Column::new("metadata", ColumnKind::Json),
        Column::new("created_at", ColumnKind::Timestamp),
        Column::new("updated_at", ColumnKind::Timestamp),
    ],
};

fn attribute_exists(conn: &Connection, patient_id: &str, attribute_id: &str) -> DbResult<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM patient_additional_attributes WHERE patient_id = ?1 AND attribute_id = ?2",
            [patient_id, attribute_id],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    Ok(found)
}

/// Upsert keyed by `(patient_id, attribute_id)`. Exactly one value column
/// is written; the others are cleared.
pub fn upsert_patient_attribute(
    conn: &Connection,
    attr: &PatientAttribute,
    now: &DateTime<Utc>,
) -> DbResult<Upserted> {
    let existed = attribute_exists(conn, &attr.patient_id, &attr.attribute_id)?;
    let value = attr.value.as_ref();

    conn.execute(
        r#"
        INSERT INTO patient_additional_attributes (
            id, patient_id, attribute_id, attribute, number_value, string_value,
            date_value, boolean_value, metadata, created_at, updated_at,
            server_created_at, last_modified
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
        ON CONFLICT(patient_id, attribute_id) DO UPDATE SET
            attribute = excluded.attribute,
            number_value = excluded.number_value,
            string_value = excluded.string_value,
            date_value = excluded.date_value,
            boolean_value = excluded.boolean_value,
            metadata = excluded.metadata,
            created_at = excluded.created_at,
            updated_at = excluded.updated_at,
            last_modified = excluded.last_modified
        "#,
        params![
            attr.id,
            attr.patient_id,
            attr.attribute_id,
            attr.attribute,
            value.and_then(AttributeValue::as_number),
            value.and_then(AttributeValue::as_text),
            sql_opt_ts(&value.and_then(AttributeValue::as_date)),
            value.and_then(AttributeValue::as_bool),
            serde_json::to_string(&attr.metadata)?,
            sql_ts(&attr.created_at),
            sql_ts(&attr.updated_at),
            sql_ts(now),
        ],
    )?;
    Ok(if existed { Upserted::Updated } else { Upserted::Inserted })
}

fn attribute_from_row(row: &Row<'_>) -> rusqlite::Result<Stored<PatientAttribute>> {
    let number: Option<f64> = row.get("number_value")?;
    let text: Option<String> = row.get("string_value")?;
    let date = get_opt_ts(row, "date_value")?;
    let boolean: Option<bool> = row.get("boolean_value")?;

    let value = number
        .map(AttributeValue::Number)
        .or(boolean.map(AttributeValue::Boolean))
        .or(date.map(AttributeValue::Date))
        .or(text.map(AttributeValue::Text));

    Ok(Stored {
        record: PatientAttribute {
            id: row.get("id")?,
            patient_id: row.get("patient_id")?,
            attribute_id: row.get("attribute_id")?,
            attribute: row.get("attribute")?,
            value,
            metadata: get_json(row, "metadata")?,
            created_at: get_ts(row, "created_at")?,
            updated_at: get_ts(row, "updated_at")?,
        },
        lifecycle: get_lifecycle(row)?,
    })
}

impl Database {
    /// Get the attribute row for one patient and attribute id.
    pub fn get_patient_attribute(
        &self,
        patient_id: &str,
        attribute_id: &str,
    ) -> DbResult<Option<Stored<PatientAttribute>>> {
        self.conn
            .query_row(
                "SELECT * FROM patient_additional_attributes WHERE patient_id = ?1 AND attribute_id = ?2",
                [patient_id, attribute_id],
                attribute_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// All attribute rows of a patient, ordered by attribute id.
    pub fn list_patient_attributes(&self, patient_id: &str) -> DbResult<Vec<Stored<PatientAttribute>>> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM patient_additional_attributes WHERE patient_id = ? ORDER BY attribute_id",
        )?;
        let rows = stmt.query_map([patient_id], attribute_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::upsert_patient;
    use crate::models::{Metadata, Patient};
    use chrono::TimeZone;

    fn attr(id: &str, value: AttributeValue, at: DateTime<Utc>) -> PatientAttribute {
        PatientAttribute {
            id: id.to_string(),
            patient_id: "p-1".to_string(),
            attribute_id: "weight".to_string(),
            attribute: "Weight".to_string(),
            value: Some(value),
            metadata: Metadata::new(),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_one_row_per_patient_attribute() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut patient = Patient::placeholder("p-1", "test", "t", now);
        patient.metadata.clear();
        upsert_patient(db.conn(), &patient, &now).unwrap();

        let first = attr("a-1", AttributeValue::Number(61.5), now);
        assert_eq!(
            upsert_patient_attribute(db.conn(), &first, &now).unwrap(),
            Upserted::Inserted
        );

        let second = attr("a-1", AttributeValue::Text("unknown".to_string()), now);
        assert_eq!(
            upsert_patient_attribute(db.conn(), &second, &now).unwrap(),
            Upserted::Updated
        );

        let rows = db.list_patient_attributes("p-1").unwrap();
        assert_eq!(rows.len(), 1);
        // The number column was cleared by the overwrite.
        assert_eq!(
            rows[0].record.value,
            Some(AttributeValue::Text("unknown".to_string()))
        );
    }

    #[test]
    fn test_requires_patient() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        let orphan = attr("a-1", AttributeValue::Boolean(true), now);
        assert!(upsert_patient_attribute(db.conn(), &orphan, &now).is_err());
    }
}
