//! Visit database operations.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::changes::{Column, ColumnKind, TableSpec};
use super::lifecycle::{get_json, get_lifecycle, get_ts, record_exists, sql_ts, Table, Upserted};
use super::{Database, DbResult};
use crate::models::{Stored, Visit};

pub const VISITS: TableSpec = TableSpec {
    table: Table::Visits,
    columns: &[
        Column::new("id", ColumnKind::Text),
        Column::new("patient_id", ColumnKind::Text),
        Column::new("clinic_id", ColumnKind::Text),
        Column::new("provider_id", ColumnKind::Text),
        Column::new("provider_name", ColumnKind::Text),
        Column::new("check_in_timestamp", ColumnKind::Timestamp),
        Column::new("metadata", ColumnKind::Json),
        Column::new("created_at", ColumnKind::Timestamp),
        Column::new("updated_at", ColumnKind::Timestamp),
    ],
};

pub fn upsert_visit(conn: &Connection, visit: &Visit, now: &DateTime<Utc>) -> DbResult<Upserted> {
    let existed = record_exists(conn, Table::Visits, &visit.id)?;
    conn.execute(
        r#"
        INSERT INTO visits (
            id, patient_id, clinic_id, provider_id, provider_name,
            check_in_timestamp, metadata, created_at, updated_at,
            server_created_at, last_modified
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
        ON CONFLICT(id) DO UPDATE SET
            patient_id = excluded.patient_id,
            clinic_id = excluded.clinic_id,
            provider_id = excluded.provider_id,
            provider_name = excluded.provider_name,
            check_in_timestamp = excluded.check_in_timestamp,
            metadata = excluded.metadata,
            created_at = excluded.created_at,
            updated_at = excluded.updated_at,
            last_modified = excluded.last_modified
        "#,
        params![
            visit.id,
            visit.patient_id,
            visit.clinic_id,
            visit.provider_id,
            visit.provider_name,
            sql_ts(&visit.check_in_timestamp),
            serde_json::to_string(&visit.metadata)?,
            sql_ts(&visit.created_at),
            sql_ts(&visit.updated_at),
            sql_ts(now),
        ],
    )?;
    Ok(if existed { Upserted::Updated } else { Upserted::Inserted })
}

fn visit_from_row(row: &Row<'_>) -> rusqlite::Result<Stored<Visit>> {
    Ok(Stored {
        record: Visit {
            id: row.get("id")?,
            patient_id: row.get("patient_id")?,
            clinic_id: row.get("clinic_id")?,
            provider_id: row.get("provider_id")?,
            provider_name: row.get("provider_name")?,
            check_in_timestamp: get_ts(row, "check_in_timestamp")?,
            metadata: get_json(row, "metadata")?,
            created_at: get_ts(row, "created_at")?,
            updated_at: get_ts(row, "updated_at")?,
        },
        lifecycle: get_lifecycle(row)?,
    })
}

impl Database {
    pub fn get_visit(&self, id: &str) -> DbResult<Option<Stored<Visit>>> {
        self.conn
            .query_row("SELECT * FROM visits WHERE id = ?", [id], visit_from_row)
            .optional()
            .map_err(Into::into)
    }

    /// Visits of a patient, oldest check-in first.
    pub fn list_patient_visits(&self, patient_id: &str) -> DbResult<Vec<Stored<Visit>>> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM visits WHERE patient_id = ? ORDER BY check_in_timestamp, id",
        )?;
        let rows = stmt.query_map([patient_id], visit_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
