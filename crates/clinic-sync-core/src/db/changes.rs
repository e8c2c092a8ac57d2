//! Watermark queries backing pull.
//!
//! Each pull-capable table is described by a [`TableSpec`] listing the
//! columns to emit and how to render them as JSON.

use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use serde_json::{Map, Number, Value};

use super::lifecycle::Table;
use super::{Database, DbResult};
use crate::sync::{from_sql_timestamp, RawDelta, Watermark};

/// How a stored column is rendered on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Real,
    Bool,
    /// JSON text, emitted structured
    Json,
    /// Stored as UTC text, emitted as epoch milliseconds
    Timestamp,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

impl Column {
    pub const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self { name, kind }
    }
}

/// The columns a table contributes to pull, plus the table itself.
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    pub table: Table,
    pub columns: &'static [Column],
}

const SERVER_COLUMNS: [Column; 2] = [
    Column::new("server_created_at", ColumnKind::Timestamp),
    Column::new("last_modified", ColumnKind::Timestamp),
];

impl TableSpec {
    fn select_list(&self) -> String {
        self.columns
            .iter()
            .chain(SERVER_COLUMNS.iter())
            .map(|c| c.name)
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn row_to_json(&self, row: &Row<'_>) -> rusqlite::Result<Value> {
        let mut object = Map::new();
        for (idx, column) in self.columns.iter().chain(SERVER_COLUMNS.iter()).enumerate() {
            object.insert(column.name.to_string(), read_column(row, idx, column.kind)?);
        }
        Ok(Value::Object(object))
    }
}

fn read_column(row: &Row<'_>, idx: usize, kind: ColumnKind) -> rusqlite::Result<Value> {
    let value = match kind {
        ColumnKind::Text => row.get::<_, Option<String>>(idx)?.map(Value::String),
        ColumnKind::Integer => row.get::<_, Option<i64>>(idx)?.map(Value::from),
        ColumnKind::Real => row
            .get::<_, Option<f64>>(idx)?
            .and_then(Number::from_f64)
            .map(Value::Number),
        ColumnKind::Bool => row.get::<_, Option<bool>>(idx)?.map(Value::Bool),
        ColumnKind::Json => match row.get::<_, Option<String>>(idx)? {
            Some(raw) => Some(
                serde_json::from_str(&raw).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
                })?,
            ),
            None => None,
        },
        ColumnKind::Timestamp => match row.get::<_, Option<String>>(idx)? {
            Some(raw) => {
                let at = from_sql_timestamp(&raw).ok_or_else(|| {
                    rusqlite::Error::InvalidColumnType(idx, raw.clone(), Type::Text)
                })?;
                Some(Value::from(at.timestamp_millis()))
            }
            None => None,
        },
    };
    Ok(value.unwrap_or(Value::Null))
}

/// Everything in `spec`'s table that changed after `since`.
///
/// The three buckets are disjoint: a row is either newly created, updated
/// after being created before the watermark, or deleted.
pub fn changes_since(conn: &Connection, spec: &TableSpec, since: &Watermark) -> DbResult<RawDelta> {
    let table = spec.table.name();
    let since = since.to_sql();
    let select = spec.select_list();

    let created_sql = format!(
        "SELECT {select} FROM {table} \
         WHERE server_created_at > ?1 AND is_deleted = 0 \
         ORDER BY server_created_at, id"
    );
    let updated_sql = format!(
        "SELECT {select} FROM {table} \
         WHERE last_modified > ?1 AND server_created_at <= ?1 AND is_deleted = 0 \
         ORDER BY last_modified, id"
    );
    let deleted_sql = format!(
        "SELECT DISTINCT id FROM {table} \
         WHERE deleted_at > ?1 AND is_deleted = 1 \
         ORDER BY id"
    );

    let mut stmt = conn.prepare(&created_sql)?;
    let created = stmt
        .query_map([&since], |row| spec.row_to_json(row))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(&updated_sql)?;
    let updated = stmt
        .query_map([&since], |row| spec.row_to_json(row))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(&deleted_sql)?;
    let deleted = stmt
        .query_map([&since], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RawDelta::from_parts(created, updated, deleted))
}

impl Database {
    /// Pull the changes of one table on the plain connection.
    pub fn changes_since(&self, spec: &TableSpec, since: &Watermark) -> DbResult<RawDelta> {
        changes_since(&self.conn, spec, since)
    }
}
