//! Cascade soft-delete from a parent to its direct dependents.
//!
//! Only rows still active are touched, so every dependent ends up with the
//! `deleted_at` of the delete that reached it first.

use tracing::debug;

use super::{SyncContext, SyncResult};
use crate::db::{soft_delete_where, Table};

/// Rows owned by a patient, by the column holding the patient id.
const PATIENT_DEPENDENTS: [(Table, &str); 5] = [
    (Table::PatientAttributes, "patient_id"),
    (Table::Visits, "patient_id"),
    (Table::Events, "patient_id"),
    (Table::Appointments, "patient_id"),
    (Table::Prescriptions, "patient_id"),
];

/// Rows owned by a visit. Appointments hang off either visit reference.
const VISIT_DEPENDENTS: [(Table, &str); 4] = [
    (Table::Events, "visit_id"),
    (Table::Prescriptions, "visit_id"),
    (Table::Appointments, "current_visit_id"),
    (Table::Appointments, "fulfilled_visit_id"),
];

fn cascade(
    ctx: &mut SyncContext<'_>,
    parent: &'static str,
    parent_id: &str,
    dependents: &[(Table, &'static str)],
) -> SyncResult<usize> {
    let deleted_at = ctx.watermark().as_datetime();
    let now = ctx.now();
    let mut total = 0;

    for (table, column) in dependents {
        let rows = soft_delete_where(ctx.tx(), *table, *column, parent_id, &deleted_at, &now)?;
        if rows > 0 {
            debug!(parent, parent_id, table = table.name(), rows, "cascaded soft-delete");
        }
        total += rows;
    }

    ctx.stats_mut().cascaded += total;
    Ok(total)
}

/// Soft-delete everything a patient owns.
pub fn cascade_patient_delete(ctx: &mut SyncContext<'_>, patient_id: &str) -> SyncResult<usize> {
    cascade(ctx, "patients", patient_id, &PATIENT_DEPENDENTS)
}

/// Soft-delete the events, prescriptions and appointments tied to a visit.
pub fn cascade_visit_delete(ctx: &mut SyncContext<'_>, visit_id: &str) -> SyncResult<usize> {
    cascade(ctx, "visits", visit_id, &VISIT_DEPENDENTS)
}
