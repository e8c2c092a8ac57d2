//! Patient database operations.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::changes::{Column, ColumnKind, TableSpec};
use super::lifecycle::{
    get_json, get_lifecycle, get_opt_ts, get_ts, record_exists, sql_opt_ts, sql_ts, Table,
    Upserted,
};
use super::{Database, DbResult};
use crate::models::{Patient, Stored};

pub const PATIENTS: TableSpec = TableSpec {
    table: Table::Patients,
    columns: &[
        Column::new("id", ColumnKind::Text),
        Column::new("given_name", ColumnKind::Text),
        Column::new("surname", ColumnKind::Text),
        Column::new("date_of_birth", ColumnKind::Text),
        Column::new("citizenship", ColumnKind::Text),
        Column::new("hometown", ColumnKind::Text),
        Column::new("sex", ColumnKind::Text),
        Column::new("phone", ColumnKind::Text),
        Column::new("camp", ColumnKind::Text),
        Column::new("government_id", ColumnKind::Text),
        Column::new("external_patient_id", ColumnKind::Text),
        Column::new("additional_data", ColumnKind::Json),
        Column::new("metadata", ColumnKind::Json),
        Column::new("photo_url", ColumnKind::Text),
        Column::new("image_timestamp", ColumnKind::Timestamp),
        Column::new("created_at", ColumnKind::Timestamp),
        Column::new("updated_at", ColumnKind::Timestamp),
    ],
};

/// Insert a patient, or overwrite its mutable columns if the id exists.
pub fn upsert_patient(conn: &Connection, patient: &Patient, now: &DateTime<Utc>) -> DbResult<Upserted> {
    let existed = record_exists(conn, Table::Patients, &patient.id)?;
    conn.execute(
        r#"
        INSERT INTO patients (
            id, given_name, surname, date_of_birth, citizenship, hometown, sex,
            phone, camp, government_id, external_patient_id, additional_data,
            metadata, photo_url, image_timestamp, created_at, updated_at,
            server_created_at, last_modified
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?18)
        ON CONFLICT(id) DO UPDATE SET
            given_name = excluded.given_name,
            surname = excluded.surname,
            date_of_birth = excluded.date_of_birth,
            citizenship = excluded.citizenship,
            hometown = excluded.hometown,
            sex = excluded.sex,
            phone = excluded.phone,
            camp = excluded.camp,
            government_id = excluded.government_id,
            external_patient_id = excluded.external_patient_id,
            additional_data = excluded.additional_data,
            metadata = excluded.metadata,
            photo_url = excluded.photo_url,
            image_timestamp = excluded.image_timestamp,
            created_at = excluded.created_at,
            updated_at = excluded.updated_at,
            last_modified = excluded.last_modified
        "#,
        params![
            patient.id,
            patient.given_name,
            patient.surname,
            patient.date_of_birth,
            patient.citizenship,
            patient.hometown,
            patient.sex,
            patient.phone,
            patient.camp,
            patient.government_id,
            patient.external_patient_id,
            serde_json::to_string(&patient.additional_data)?,
            serde_json::to_string(&patient.metadata)?,
            patient.photo_url,
            sql_opt_ts(&patient.image_timestamp),
            sql_ts(&patient.created_at),
            sql_ts(&patient.updated_at),
            sql_ts(now),
        ],
    )?;
    Ok(if existed { Upserted::Updated } else { Upserted::Inserted })
}

/// Insert a placeholder patient already soft-deleted at `now`.
///
/// Does nothing if a row with the id exists.
pub fn insert_placeholder_patient(conn: &Connection, patient: &Patient, now: &DateTime<Utc>) -> DbResult<bool> {
    let rows = conn.execute(
        r#"
        INSERT INTO patients (
            id, additional_data, metadata, created_at, updated_at,
            server_created_at, last_modified, is_deleted, deleted_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, 1, ?6)
        ON CONFLICT(id) DO NOTHING
        "#,
        params![
            patient.id,
            serde_json::to_string(&patient.additional_data)?,
            serde_json::to_string(&patient.metadata)?,
            sql_ts(&patient.created_at),
            sql_ts(&patient.updated_at),
            sql_ts(now),
        ],
    )?;
    Ok(rows > 0)
}

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Stored<Patient>> {
    Ok(Stored {
        record: Patient {
            id: row.get("id")?,
            given_name: row.get("given_name")?,
            surname: row.get("surname")?,
            date_of_birth: row.get("date_of_birth")?,
            citizenship: row.get("citizenship")?,
            hometown: row.get("hometown")?,
            sex: row.get("sex")?,
            phone: row.get("phone")?,
            camp: row.get("camp")?,
            government_id: row.get("government_id")?,
            external_patient_id: row.get("external_patient_id")?,
            additional_data: get_json(row, "additional_data")?,
            metadata: get_json(row, "metadata")?,
            photo_url: row.get("photo_url")?,
            image_timestamp: get_opt_ts(row, "image_timestamp")?,
            created_at: get_ts(row, "created_at")?,
            updated_at: get_ts(row, "updated_at")?,
        },
        lifecycle: get_lifecycle(row)?,
    })
}

impl Database {
    /// Get a patient by id, deleted or not.
    pub fn get_patient(&self, id: &str) -> DbResult<Option<Stored<Patient>>> {
        self.conn
            .query_row("SELECT * FROM patients WHERE id = ?", [id], patient_from_row)
            .optional()
            .map_err(Into::into)
    }

    /// Count patient rows, including soft-deleted ones.
    pub fn count_patients(&self) -> DbResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttributeMap, AttributeValue, Metadata};
    use chrono::TimeZone;

    fn jane(now: DateTime<Utc>) -> Patient {
        let mut additional_data = AttributeMap::new();
        additional_data.insert("blood_type".to_string(), AttributeValue::Text("O+".to_string()));
        Patient {
            id: "p-1".to_string(),
            given_name: Some("Jane".to_string()),
            surname: Some("Doe".to_string()),
            date_of_birth: Some("1990-04-02".to_string()),
            citizenship: None,
            hometown: None,
            sex: Some("female".to_string()),
            phone: None,
            camp: None,
            government_id: None,
            external_patient_id: None,
            additional_data,
            metadata: Metadata::new(),
            photo_url: None,
            image_timestamp: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_upsert_then_overwrite() {
        let db = Database::open_in_memory().unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();

        let mut patient = jane(t1);
        assert_eq!(upsert_patient(db.conn(), &patient, &t1).unwrap(), Upserted::Inserted);

        patient.given_name = Some("Janet".to_string());
        assert_eq!(upsert_patient(db.conn(), &patient, &t2).unwrap(), Upserted::Updated);

        let stored = db.get_patient("p-1").unwrap().unwrap();
        assert_eq!(stored.record.given_name.as_deref(), Some("Janet"));
        assert_eq!(stored.record.additional_data, patient.additional_data);
        assert_eq!(stored.lifecycle.server_created_at, t1);
        assert_eq!(stored.lifecycle.last_modified, t2);
        assert!(!stored.is_deleted());
        assert_eq!(db.count_patients().unwrap(), 1);
    }

    #[test]
    fn test_placeholder_never_overwrites() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        upsert_patient(db.conn(), &jane(now), &now).unwrap();

        let placeholder = Patient::placeholder("p-1", "visits", "v-1", now);
        assert!(!insert_placeholder_patient(db.conn(), &placeholder, &now).unwrap());

        let stored = db.get_patient("p-1").unwrap().unwrap();
        assert!(!stored.is_deleted());
        assert!(!stored.record.is_artificial());
    }

    #[test]
    fn test_placeholder_is_deleted() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let placeholder = Patient::placeholder("p-9", "events", "e-1", now);
        assert!(insert_placeholder_patient(db.conn(), &placeholder, &now).unwrap());

        let stored = db.get_patient("p-9").unwrap().unwrap();
        assert!(stored.is_deleted());
        assert_eq!(stored.lifecycle.deleted_at, Some(now));
        assert!(stored.record.is_artificial());
    }
}
