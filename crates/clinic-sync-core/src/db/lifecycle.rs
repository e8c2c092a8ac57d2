//! Lifecycle columns shared by all syncable tables: timestamp encoding,
//! existence checks and soft-delete.

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;

use super::DbResult;
use crate::models::Lifecycle;
use crate::sync::{from_sql_timestamp, to_sql_timestamp, TimestampError};

/// Tables known to the store. Names are never taken from input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Patients,
    PatientAttributes,
    Visits,
    Events,
    Appointments,
    Prescriptions,
    Clinics,
    EventForms,
    RegistrationForms,
    StringIds,
    StringContent,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Patients => "patients",
            Table::PatientAttributes => "patient_additional_attributes",
            Table::Visits => "visits",
            Table::Events => "events",
            Table::Appointments => "appointments",
            Table::Prescriptions => "prescriptions",
            Table::Clinics => "clinics",
            Table::EventForms => "event_forms",
            Table::RegistrationForms => "patient_registration_forms",
            Table::StringIds => "string_ids",
            Table::StringContent => "string_content",
        }
    }
}

/// Whether an upsert created the row or overwrote an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    Inserted,
    Updated,
}

pub(crate) fn sql_ts(at: &DateTime<Utc>) -> String {
    to_sql_timestamp(at)
}

pub(crate) fn sql_opt_ts(at: &Option<DateTime<Utc>>) -> Option<String> {
    at.as_ref().map(to_sql_timestamp)
}

fn conversion_error(column: &str, raw: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        Type::Text,
        Box::new(TimestampError::Unparsable(format!("{column}: {raw}"))),
    )
}

pub(crate) fn get_ts(row: &Row<'_>, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(column)?;
    from_sql_timestamp(&raw).ok_or_else(|| conversion_error(column, &raw))
}

pub(crate) fn get_opt_ts(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(column)?;
    raw.map(|raw| from_sql_timestamp(&raw).ok_or_else(|| conversion_error(column, &raw)))
        .transpose()
}

pub(crate) fn get_json<T: DeserializeOwned>(row: &Row<'_>, column: &str) -> rusqlite::Result<T> {
    let raw: String = row.get(column)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
}

pub(crate) fn get_lifecycle(row: &Row<'_>) -> rusqlite::Result<Lifecycle> {
    Ok(Lifecycle {
        server_created_at: get_ts(row, "server_created_at")?,
        last_modified: get_ts(row, "last_modified")?,
        is_deleted: row.get("is_deleted")?,
        deleted_at: get_opt_ts(row, "deleted_at")?,
    })
}

/// Whether any row (deleted or not) carries this id.
pub fn record_exists(conn: &Connection, table: Table, id: &str) -> DbResult<bool> {
    let sql = format!("SELECT 1 FROM {} WHERE id = ?1 LIMIT 1", table.name());
    let found = conn
        .query_row(&sql, [id], |_| Ok(()))
        .optional()?
        .is_some();
    Ok(found)
}

/// Soft-delete the active rows with this id. Already-deleted rows keep
/// their original `deleted_at`.
pub fn soft_delete(
    conn: &Connection,
    table: Table,
    id: &str,
    deleted_at: &DateTime<Utc>,
    now: &DateTime<Utc>,
) -> DbResult<usize> {
    soft_delete_where(conn, table, "id", id, deleted_at, now)
}

/// Soft-delete every active row whose `column` equals `value`.
pub fn soft_delete_where(
    conn: &Connection,
    table: Table,
    column: &'static str,
    value: &str,
    deleted_at: &DateTime<Utc>,
    now: &DateTime<Utc>,
) -> DbResult<usize> {
    let sql = format!(
        "UPDATE {} SET is_deleted = 1, deleted_at = ?1, updated_at = ?2, last_modified = ?2 \
         WHERE {} = ?3 AND is_deleted = 0",
        table.name(),
        column
    );
    let rows = conn.execute(&sql, params![sql_ts(deleted_at), sql_ts(now), value])?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use chrono::TimeZone;

    fn insert_clinic(db: &Database, id: &str) {
        let at = "2024-01-01T00:00:00.000Z";
        db.conn()
            .execute(
                "INSERT INTO clinics (id, name, created_at, updated_at, server_created_at, last_modified)
                 VALUES (?1, 'Main', ?2, ?2, ?2, ?2)",
                params![id, at],
            )
            .unwrap();
    }

    #[test]
    fn test_exists_and_soft_delete() {
        let db = Database::open_in_memory().unwrap();
        insert_clinic(&db, "c-1");

        assert!(record_exists(db.conn(), Table::Clinics, "c-1").unwrap());
        assert!(!record_exists(db.conn(), Table::Clinics, "c-2").unwrap());

        let first = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(
            soft_delete(db.conn(), Table::Clinics, "c-1", &first, &first).unwrap(),
            1
        );
        // Deleted is terminal.
        assert_eq!(
            soft_delete(db.conn(), Table::Clinics, "c-1", &second, &second).unwrap(),
            0
        );

        let deleted_at: String = db
            .conn()
            .query_row("SELECT deleted_at FROM clinics WHERE id = 'c-1'", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(deleted_at, "2024-02-01T00:00:00.000Z");
        assert!(record_exists(db.conn(), Table::Clinics, "c-1").unwrap());
    }
}
