//! Appointment database operations.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::changes::{Column, ColumnKind, TableSpec};
use super::lifecycle::{get_json, get_lifecycle, get_ts, record_exists, sql_ts, Table, Upserted};
use super::{Database, DbResult};
use crate::models::{Appointment, Stored};

pub const APPOINTMENTS: TableSpec = TableSpec {
    table: Table::Appointments,
    columns: &[
        Column::new("id", ColumnKind::Text),
        Column::new("patient_id", ColumnKind::Text),
        Column::new("provider_id", ColumnKind::Text),
        Column::new("clinic_id", ColumnKind::Text),
        Column::new("user_id", ColumnKind::Text),
        Column::new("current_visit_id", ColumnKind::Text),
        Column::new("fulfilled_visit_id", ColumnKind::Text),
        Column::new("timestamp", ColumnKind::Timestamp),
        Column::new("duration", ColumnKind::Integer),
        Column::new("reason", ColumnKind::Text),
        Column::new("notes", ColumnKind::Text),
        Column::new("status", ColumnKind::Text),
        Column::new("metadata", ColumnKind::Json),
        Column::new("created_at", ColumnKind::Timestamp),
        Column::new("updated_at", ColumnKind::Timestamp),
    ],
};

pub fn upsert_appointment(
    conn: &Connection,
    appointment: &Appointment,
    now: &DateTime<Utc>,
) -> DbResult<Upserted> {
    let existed = record_exists(conn, Table::Appointments, &appointment.id)?;
    conn.execute(
        r#"
        INSERT INTO appointments (
            id, patient_id, provider_id, clinic_id, user_id, current_visit_id,
            fulfilled_visit_id, timestamp, duration, reason, notes, status,
            metadata, created_at, updated_at, server_created_at, last_modified
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16)
        ON CONFLICT(id) DO UPDATE SET
            patient_id = excluded.patient_id,
            provider_id = excluded.provider_id,
            clinic_id = excluded.clinic_id,
            user_id = excluded.user_id,
            current_visit_id = excluded.current_visit_id,
            fulfilled_visit_id = excluded.fulfilled_visit_id,
            timestamp = excluded.timestamp,
            duration = excluded.duration,
            reason = excluded.reason,
            notes = excluded.notes,
            status = excluded.status,
            metadata = excluded.metadata,
            created_at = excluded.created_at,
            updated_at = excluded.updated_at,
            last_modified = excluded.last_modified
        "#,
        params![
            appointment.id,
            appointment.patient_id,
            appointment.provider_id,
            appointment.clinic_id,
            appointment.user_id,
            appointment.current_visit_id,
            appointment.fulfilled_visit_id,
            sql_ts(&appointment.timestamp),
            appointment.duration,
            appointment.reason,
            appointment.notes,
            appointment.status,
            serde_json::to_string(&appointment.metadata)?,
            sql_ts(&appointment.created_at),
            sql_ts(&appointment.updated_at),
            sql_ts(now),
        ],
    )?;
    Ok(if existed { Upserted::Updated } else { Upserted::Inserted })
}

fn appointment_from_row(row: &Row<'_>) -> rusqlite::Result<Stored<Appointment>> {
    Ok(Stored {
        record: Appointment {
            id: row.get("id")?,
            patient_id: row.get("patient_id")?,
            provider_id: row.get("provider_id")?,
            clinic_id: row.get("clinic_id")?,
            user_id: row.get("user_id")?,
            current_visit_id: row.get("current_visit_id")?,
            fulfilled_visit_id: row.get("fulfilled_visit_id")?,
            timestamp: get_ts(row, "timestamp")?,
            duration: row.get("duration")?,
            reason: row.get("reason")?,
            notes: row.get("notes")?,
            status: row.get("status")?,
            metadata: get_json(row, "metadata")?,
            created_at: get_ts(row, "created_at")?,
            updated_at: get_ts(row, "updated_at")?,
        },
        lifecycle: get_lifecycle(row)?,
    })
}

impl Database {
    pub fn get_appointment(&self, id: &str) -> DbResult<Option<Stored<Appointment>>> {
        self.conn
            .query_row("SELECT * FROM appointments WHERE id = ?", [id], appointment_from_row)
            .optional()
            .map_err(Into::into)
    }
}
