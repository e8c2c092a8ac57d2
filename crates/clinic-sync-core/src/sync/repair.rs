//! Referential auto-repair.
//!
//! A child whose required patient is unknown gets a placeholder patient,
//! inserted already soft-deleted. An optional reference to an unknown row
//! is cleared. Neither case fails the push; both are logged.

use tracing::warn;

use super::{SyncContext, SyncResult};
use crate::db::{insert_placeholder_patient, record_exists, Table};
use crate::models::Patient;

/// Make sure `patient_id` exists, fabricating a placeholder if it does not.
///
/// Returns `true` when a placeholder was inserted.
pub fn ensure_patient(
    ctx: &mut SyncContext<'_>,
    patient_id: &str,
    source_key: &'static str,
    source_id: &str,
) -> SyncResult<bool> {
    if record_exists(ctx.tx(), Table::Patients, patient_id)? {
        return Ok(false);
    }

    let now = ctx.now();
    let placeholder = Patient::placeholder(patient_id, source_key, source_id, now);
    let inserted = insert_placeholder_patient(ctx.tx(), &placeholder, &now)?;
    if inserted {
        warn!(
            patient_id,
            record_type = source_key,
            record_id = source_id,
            "referenced patient does not exist; inserted placeholder"
        );
        ctx.stats_mut().placeholders += 1;
    }
    Ok(inserted)
}

/// Keep `reference` only if it names an existing row of `table`.
///
/// Empty strings are treated as absent.
pub fn optional_reference(
    ctx: &mut SyncContext<'_>,
    table: Table,
    field: &'static str,
    reference: Option<String>,
    source_key: &'static str,
    source_id: &str,
) -> SyncResult<Option<String>> {
    let Some(id) = reference.filter(|id| !id.is_empty()) else {
        return Ok(None);
    };

    if record_exists(ctx.tx(), table, &id)? {
        return Ok(Some(id));
    }

    warn!(
        field,
        missing_id = %id,
        record_type = source_key,
        record_id = source_id,
        "optional reference points nowhere; cleared"
    );
    ctx.stats_mut().nulled_references += 1;
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::sync::Watermark;
    use chrono::Utc;

    #[test]
    fn test_placeholder_inserted_once() {
        let mut db = Database::open_in_memory().unwrap();
        let tx = db.transaction().unwrap();
        let mut ctx = SyncContext::new(Watermark::now(), Utc::now(), &tx);

        assert!(ensure_patient(&mut ctx, "p-1", "visits", "v-1").unwrap());
        assert!(!ensure_patient(&mut ctx, "p-1", "visits", "v-2").unwrap());
        assert_eq!(ctx.take_stats().placeholders, 1);
        drop(ctx);
        tx.commit().unwrap();

        let patient = db.get_patient("p-1").unwrap().unwrap();
        assert!(patient.is_deleted());
        assert!(patient.record.is_artificial());
    }

    #[test]
    fn test_missing_optional_reference_is_cleared() {
        let mut db = Database::open_in_memory().unwrap();
        let tx = db.transaction().unwrap();
        let mut ctx = SyncContext::new(Watermark::now(), Utc::now(), &tx);

        let kept = optional_reference(
            &mut ctx,
            Table::Visits,
            "visit_id",
            Some("v-404".to_string()),
            "events",
            "e-1",
        )
        .unwrap();
        assert_eq!(kept, None);

        let blank =
            optional_reference(&mut ctx, Table::Visits, "visit_id", Some(String::new()), "events", "e-1")
                .unwrap();
        assert_eq!(blank, None);
        assert_eq!(ctx.stats_mut().nulled_references, 1);
    }
}
