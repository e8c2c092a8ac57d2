//! Pull-only reference tables and their seeding helpers.

use chrono::Utc;
use rusqlite::params;

use super::changes::{Column, ColumnKind, TableSpec};
use super::lifecycle::{soft_delete, sql_ts, Table};
use super::{Database, DbResult};
use crate::models::{Clinic, EventForm, RegistrationForm, StringContent};

pub const CLINICS: TableSpec = TableSpec {
    table: Table::Clinics,
    columns: &[
        Column::new("id", ColumnKind::Text),
        Column::new("name", ColumnKind::Text),
        Column::new("created_at", ColumnKind::Timestamp),
        Column::new("updated_at", ColumnKind::Timestamp),
    ],
};

pub const EVENT_FORMS: TableSpec = TableSpec {
    table: Table::EventForms,
    columns: &[
        Column::new("id", ColumnKind::Text),
        Column::new("name", ColumnKind::Text),
        Column::new("description", ColumnKind::Text),
        Column::new("language", ColumnKind::Text),
        Column::new("is_editable", ColumnKind::Bool),
        Column::new("is_snapshot_form", ColumnKind::Bool),
        Column::new("form_fields", ColumnKind::Json),
        Column::new("metadata", ColumnKind::Json),
        Column::new("created_at", ColumnKind::Timestamp),
        Column::new("updated_at", ColumnKind::Timestamp),
    ],
};

pub const REGISTRATION_FORMS: TableSpec = TableSpec {
    table: Table::RegistrationForms,
    columns: &[
        Column::new("id", ColumnKind::Text),
        Column::new("name", ColumnKind::Text),
        Column::new("fields", ColumnKind::Json),
        Column::new("metadata", ColumnKind::Json),
        Column::new("created_at", ColumnKind::Timestamp),
        Column::new("updated_at", ColumnKind::Timestamp),
    ],
};

pub const STRING_IDS: TableSpec = TableSpec {
    table: Table::StringIds,
    columns: &[
        Column::new("id", ColumnKind::Text),
        Column::new("created_at", ColumnKind::Timestamp),
        Column::new("updated_at", ColumnKind::Timestamp),
    ],
};

pub const STRING_CONTENT: TableSpec = TableSpec {
    table: Table::StringContent,
    columns: &[
        Column::new("id", ColumnKind::Text),
        Column::new("language", ColumnKind::Text),
        Column::new("value", ColumnKind::Text),
        Column::new("created_at", ColumnKind::Timestamp),
        Column::new("updated_at", ColumnKind::Timestamp),
    ],
};

impl Database {
    /// Insert or replace a clinic.
    pub fn seed_clinic(&self, clinic: &Clinic) -> DbResult<()> {
        let now = sql_ts(&Utc::now());
        self.conn.execute(
            r#"
            INSERT INTO clinics (id, name, created_at, updated_at, server_created_at, last_modified)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                updated_at = excluded.updated_at,
                last_modified = excluded.last_modified
            "#,
            params![
                clinic.id,
                clinic.name,
                sql_ts(&clinic.created_at),
                sql_ts(&clinic.updated_at),
                now,
            ],
        )?;
        Ok(())
    }

    /// Insert or replace an event form template.
    pub fn seed_event_form(&self, form: &EventForm) -> DbResult<()> {
        let now = sql_ts(&Utc::now());
        self.conn.execute(
            r#"
            INSERT INTO event_forms (
                id, name, description, language, is_editable, is_snapshot_form,
                form_fields, metadata, created_at, updated_at, server_created_at, last_modified
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                language = excluded.language,
                is_editable = excluded.is_editable,
                is_snapshot_form = excluded.is_snapshot_form,
                form_fields = excluded.form_fields,
                metadata = excluded.metadata,
                updated_at = excluded.updated_at,
                last_modified = excluded.last_modified
            "#,
            params![
                form.id,
                form.name,
                form.description,
                form.language,
                form.is_editable,
                form.is_snapshot_form,
                serde_json::to_string(&form.form_fields)?,
                serde_json::to_string(&form.metadata)?,
                sql_ts(&form.created_at),
                sql_ts(&form.updated_at),
                now,
            ],
        )?;
        Ok(())
    }

    /// Insert or replace a patient registration form.
    pub fn seed_registration_form(&self, form: &RegistrationForm) -> DbResult<()> {
        let now = sql_ts(&Utc::now());
        self.conn.execute(
            r#"
            INSERT INTO patient_registration_forms (
                id, name, fields, metadata, created_at, updated_at, server_created_at, last_modified
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                fields = excluded.fields,
                metadata = excluded.metadata,
                updated_at = excluded.updated_at,
                last_modified = excluded.last_modified
            "#,
            params![
                form.id,
                form.name,
                serde_json::to_string(&form.fields)?,
                serde_json::to_string(&form.metadata)?,
                sql_ts(&form.created_at),
                sql_ts(&form.updated_at),
                now,
            ],
        )?;
        Ok(())
    }

    /// Register a localization string id with its translations.
    pub fn seed_string(&mut self, id: &str, translations: &[StringContent]) -> DbResult<()> {
        let now = sql_ts(&Utc::now());
        let tx = self.conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO string_ids (id, created_at, updated_at, server_created_at, last_modified)
            VALUES (?1, ?2, ?2, ?2, ?2)
            ON CONFLICT(id) DO UPDATE SET updated_at = excluded.updated_at, last_modified = excluded.last_modified
            "#,
            params![id, now],
        )?;
        for content in translations {
            tx.execute(
                r#"
                INSERT INTO string_content (id, language, value, created_at, updated_at, server_created_at, last_modified)
                VALUES (?1, ?2, ?3, ?4, ?4, ?4, ?4)
                ON CONFLICT(id, language) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at,
                    last_modified = excluded.last_modified
                "#,
                params![id, content.language, content.value, now],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Soft-delete a reference row so pulls report it under `deleted`.
    pub fn retire_reference(&self, table: Table, id: &str) -> DbResult<bool> {
        let now = Utc::now();
        Ok(soft_delete(&self.conn, table, id, &now, &now)? > 0)
    }
}
