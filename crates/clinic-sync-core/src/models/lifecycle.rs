//! Server-side lifecycle columns shared by every syncable table.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Sync bookkeeping for a stored row.
///
/// `server_created_at` is written once on first insert and never moves;
/// `last_modified` is refreshed on every write, so it is never earlier.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Lifecycle {
    pub server_created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A record as read back from storage, with its lifecycle columns.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Stored<T> {
    #[serde(flatten)]
    pub record: T,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

impl<T> Stored<T> {
    pub fn is_deleted(&self) -> bool {
        self.lifecycle.is_deleted
    }
}
