//! Prescription database operations.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::changes::{Column, ColumnKind, TableSpec};
use super::lifecycle::{
    get_json, get_lifecycle, get_opt_ts, get_ts, record_exists, sql_opt_ts, sql_ts, Table,
    Upserted,
};
use super::{Database, DbResult};
use crate::models::{Prescription, Stored};

pub const PRESCRIPTIONS: TableSpec = TableSpec {
    table: Table::Prescriptions,
    columns: &[
        Column::new("id", ColumnKind::Text),
        Column::new("patient_id", ColumnKind::Text),
        Column::new("provider_id", ColumnKind::Text),
        Column::new("filled_by", ColumnKind::Text),
        Column::new("pickup_clinic_id", ColumnKind::Text),
        Column::new("visit_id", ColumnKind::Text),
        Column::new("priority", ColumnKind::Text),
        Column::new("expiration_date", ColumnKind::Timestamp),
        Column::new("prescribed_at", ColumnKind::Timestamp),
        Column::new("filled_at", ColumnKind::Timestamp),
        Column::new("status", ColumnKind::Text),
        Column::new("items", ColumnKind::Json),
        Column::new("notes", ColumnKind::Text),
        Column::new("metadata", ColumnKind::Json),
        Column::new("created_at", ColumnKind::Timestamp),
        Column::new("updated_at", ColumnKind::Timestamp),
    ],
};

pub fn upsert_prescription(
    conn: &Connection,
    prescription: &Prescription,
    now: &DateTime<Utc>,
) -> DbResult<Upserted> {
    let existed = record_exists(conn, Table::Prescriptions, &prescription.id)?;
    conn.execute(
        r#"
        INSERT INTO prescriptions (
            id, patient_id, provider_id, filled_by, pickup_clinic_id, visit_id,
            priority, expiration_date, prescribed_at, filled_at, status, items,
            notes, metadata, created_at, updated_at, server_created_at, last_modified
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?17)
        ON CONFLICT(id) DO UPDATE SET
            patient_id = excluded.patient_id,
            provider_id = excluded.provider_id,
            filled_by = excluded.filled_by,
            pickup_clinic_id = excluded.pickup_clinic_id,
            visit_id = excluded.visit_id,
            priority = excluded.priority,
            expiration_date = excluded.expiration_date,
            prescribed_at = excluded.prescribed_at,
            filled_at = excluded.filled_at,
            status = excluded.status,
            items = excluded.items,
            notes = excluded.notes,
            metadata = excluded.metadata,
            created_at = excluded.created_at,
            updated_at = excluded.updated_at,
            last_modified = excluded.last_modified
        "#,
        params![
            prescription.id,
            prescription.patient_id,
            prescription.provider_id,
            prescription.filled_by,
            prescription.pickup_clinic_id,
            prescription.visit_id,
            prescription.priority,
            sql_opt_ts(&prescription.expiration_date),
            sql_ts(&prescription.prescribed_at),
            sql_opt_ts(&prescription.filled_at),
            prescription.status,
            serde_json::to_string(&prescription.items)?,
            prescription.notes,
            serde_json::to_string(&prescription.metadata)?,
            sql_ts(&prescription.created_at),
            sql_ts(&prescription.updated_at),
            sql_ts(now),
        ],
    )?;
    Ok(if existed { Upserted::Updated } else { Upserted::Inserted })
}

fn prescription_from_row(row: &Row<'_>) -> rusqlite::Result<Stored<Prescription>> {
    Ok(Stored {
        record: Prescription {
            id: row.get("id")?,
            patient_id: row.get("patient_id")?,
            provider_id: row.get("provider_id")?,
            filled_by: row.get("filled_by")?,
            pickup_clinic_id: row.get("pickup_clinic_id")?,
            visit_id: row.get("visit_id")?,
            priority: row.get("priority")?,
            expiration_date: get_opt_ts(row, "expiration_date")?,
            prescribed_at: get_ts(row, "prescribed_at")?,
            filled_at: get_opt_ts(row, "filled_at")?,
            status: row.get("status")?,
            items: get_json(row, "items")?,
            notes: row.get("notes")?,
            metadata: get_json(row, "metadata")?,
            created_at: get_ts(row, "created_at")?,
            updated_at: get_ts(row, "updated_at")?,
        },
        lifecycle: get_lifecycle(row)?,
    })
}

impl Database {
    pub fn get_prescription(&self, id: &str) -> DbResult<Option<Stored<Prescription>>> {
        self.conn
            .query_row("SELECT * FROM prescriptions WHERE id = ?", [id], prescription_from_row)
            .optional()
            .map_err(Into::into)
    }
}
