//! Clinical event database operations.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::changes::{Column, ColumnKind, TableSpec};
use super::lifecycle::{get_json, get_lifecycle, get_ts, record_exists, sql_ts, Table, Upserted};
use super::{Database, DbResult};
use crate::models::{ClinicalEvent, Stored};

pub const EVENTS: TableSpec = TableSpec {
    table: Table::Events,
    columns: &[
        Column::new("id", ColumnKind::Text),
        Column::new("patient_id", ColumnKind::Text),
        Column::new("visit_id", ColumnKind::Text),
        Column::new("form_id", ColumnKind::Text),
        Column::new("event_type", ColumnKind::Text),
        Column::new("form_data", ColumnKind::Json),
        Column::new("metadata", ColumnKind::Json),
        Column::new("created_at", ColumnKind::Timestamp),
        Column::new("updated_at", ColumnKind::Timestamp),
    ],
};

pub fn upsert_event(conn: &Connection, event: &ClinicalEvent, now: &DateTime<Utc>) -> DbResult<Upserted> {
    let existed = record_exists(conn, Table::Events, &event.id)?;
    conn.execute(
        r#"
        INSERT INTO events (
            id, patient_id, visit_id, form_id, event_type, form_data, metadata,
            created_at, updated_at, server_created_at, last_modified
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
        ON CONFLICT(id) DO UPDATE SET
            patient_id = excluded.patient_id,
            visit_id = excluded.visit_id,
            form_id = excluded.form_id,
            event_type = excluded.event_type,
            form_data = excluded.form_data,
            metadata = excluded.metadata,
            created_at = excluded.created_at,
            updated_at = excluded.updated_at,
            last_modified = excluded.last_modified
        "#,
        params![
            event.id,
            event.patient_id,
            event.visit_id,
            event.form_id,
            event.event_type,
            serde_json::to_string(&event.form_data)?,
            serde_json::to_string(&event.metadata)?,
            sql_ts(&event.created_at),
            sql_ts(&event.updated_at),
            sql_ts(now),
        ],
    )?;
    Ok(if existed { Upserted::Updated } else { Upserted::Inserted })
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Stored<ClinicalEvent>> {
    Ok(Stored {
        record: ClinicalEvent {
            id: row.get("id")?,
            patient_id: row.get("patient_id")?,
            visit_id: row.get("visit_id")?,
            form_id: row.get("form_id")?,
            event_type: row.get("event_type")?,
            form_data: get_json(row, "form_data")?,
            metadata: get_json(row, "metadata")?,
            created_at: get_ts(row, "created_at")?,
            updated_at: get_ts(row, "updated_at")?,
        },
        lifecycle: get_lifecycle(row)?,
    })
}

impl Database {
    pub fn get_event(&self, id: &str) -> DbResult<Option<Stored<ClinicalEvent>>> {
        self.conn
            .query_row("SELECT * FROM events WHERE id = ?", [id], event_from_row)
            .optional()
            .map_err(Into::into)
    }

    /// Events recorded during a visit.
    pub fn list_visit_events(&self, visit_id: &str) -> DbResult<Vec<Stored<ClinicalEvent>>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM events WHERE visit_id = ? ORDER BY created_at, id")?;
        let rows = stmt.query_map([visit_id], event_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
