//! Per-push state threaded through transform and apply.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;

use super::Watermark;
use crate::db::Upserted;

/// Counts for one record type within one push. Logged, never returned to
/// the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplyStats {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Dependents soft-deleted by cascade
    pub cascaded: usize,
    /// Placeholder parents fabricated by auto-repair
    pub placeholders: usize,
    /// Optional references cleared by auto-repair
    pub nulled_references: usize,
}

impl ApplyStats {
    pub fn record_upsert(&mut self, outcome: Upserted) {
        match outcome {
            Upserted::Inserted => self.created += 1,
            Upserted::Updated => self.updated += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.created + self.updated + self.deleted
    }
}

/// The push watermark, the server clock for this request, and the open
/// transaction every write goes through.
pub struct SyncContext<'a> {
    watermark: Watermark,
    now: DateTime<Utc>,
    tx: &'a Connection,
    stats: ApplyStats,
}

impl<'a> SyncContext<'a> {
    /// `tx` is normally a [`rusqlite::Transaction`] (which derefs to a
    /// connection).
    pub fn new(watermark: Watermark, now: DateTime<Utc>, tx: &'a Connection) -> Self {
        Self {
            watermark,
            now,
            tx,
            stats: ApplyStats::default(),
        }
    }

    /// The watermark the client supplied; deletes are stamped with it.
    pub fn watermark(&self) -> Watermark {
        self.watermark
    }

    /// Server time for this push. Every write in the push shares it.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn tx(&self) -> &'a Connection {
        self.tx
    }

    pub fn stats_mut(&mut self) -> &mut ApplyStats {
        &mut self.stats
    }

    /// Hand back the counts gathered so far and start over.
    pub fn take_stats(&mut self) -> ApplyStats {
        std::mem::take(&mut self.stats)
    }
}
