//! File-backed store: committed pushes survive a reopen, failed ones leave
//! nothing behind.

use chrono::{TimeZone, Utc};
use clinic_sync_core::{
    Credentials, Database, Principal, StaticCallerResolver, SyncConfig, SyncService, Watermark,
};
use serde_json::json;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn open(config: &SyncConfig) -> SyncService {
    let resolver = StaticCallerResolver::new().with_token(
        "tok",
        Principal {
            user_id: "u-1".to_string(),
            clinic_id: None,
        },
    );
    SyncService::open(config.clone(), Arc::new(resolver)).unwrap()
}

fn creds() -> Credentials {
    Credentials::Token("tok".to_string())
}

#[test]
fn test_committed_push_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let config = SyncConfig::new(dir.path().join("clinic.db"))
        .with_busy_timeout(Duration::from_millis(200));

    {
        let svc = open(&config);
        svc.handle_push(
            &creds(),
            Some(&json!(0)),
            json!({
                "patients": {"created": [{"id": "p-1", "given_name": "Rania"}]},
                "visits": {"created": [{"id": "v-1", "patient_id": "p-1"}]}
            }),
        )
        .unwrap();
    }

    let db = Database::open(dir.path().join("clinic.db")).unwrap();
    let patient = db.get_patient("p-1").unwrap().unwrap();
    assert_eq!(patient.record.given_name.as_deref(), Some("Rania"));
    assert_eq!(db.list_patient_visits("p-1").unwrap().len(), 1);

    let since = Watermark::from_millis(0).unwrap();
    let pulled = db.changes_since(&clinic_sync_core::db::VISITS, &since).unwrap();
    assert_eq!(pulled.created.len(), 1);
}

#[test]
fn test_failed_push_leaves_file_untouched() {
    let dir = TempDir::new().unwrap();
    let config = SyncConfig::new(dir.path().join("clinic.db"));

    {
        let svc = open(&config);
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let err = svc.push_at(
            &creds(),
            Some(&json!(0)),
            json!({
                "patients": {"created": [{"id": "p-1"}]},
                "prescriptions": {"created": [{"id": "rx-1", "patient_id": "p-1", "items": 5, "status": 7}]}
            }),
            now,
        );
        assert!(err.is_err());
    }

    let db = Database::open(dir.path().join("clinic.db")).unwrap();
    assert_eq!(db.count_patients().unwrap(), 0);
    assert!(db.get_prescription("rx-1").unwrap().is_none());
}

#[test]
fn test_push_waits_for_writer_on_same_file() {
    let dir = TempDir::new().unwrap();
    let config = SyncConfig::new(dir.path().join("clinic.db"))
        .with_busy_timeout(Duration::from_secs(5));
    let holder_svc = open(&config);
    let pusher_svc = open(&config);

    let (locked_tx, locked_rx) = mpsc::channel();
    let db = holder_svc.database();
    let holder = thread::spawn(move || {
        let mut db = db.lock().unwrap();
        let tx = db.transaction().unwrap();
        tx.execute_batch("UPDATE clinics SET name = name").unwrap();
        locked_tx.send(()).unwrap();
        thread::sleep(Duration::from_millis(200));
        tx.commit().unwrap();
    });

    locked_rx.recv().unwrap();
    let started = Instant::now();
    let response = pusher_svc
        .handle_push(
            &creds(),
            Some(&json!(0)),
            json!({"patients": {"created": [{"id": "p-1", "given_name": "Rania"}]}}),
        )
        .unwrap();
    holder.join().unwrap();

    assert!(response.ok);
    assert!(started.elapsed() >= Duration::from_millis(100));
    let db = holder_svc.database();
    let db = db.lock().unwrap();
    assert!(db.get_patient("p-1").unwrap().is_some());
}
