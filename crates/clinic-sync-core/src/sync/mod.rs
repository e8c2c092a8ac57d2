//! The synchronization engine.
//!
//! Push: a client body is split into one [`RawDelta`] per record type, and
//! the [`Sink`] applies them in dependency order inside one transaction.
//! Pull: the [`PullRegistry`] runs the three watermark queries for every
//! pull-capable type against the plain connection.

mod capability;
mod cascade;
mod context;
mod delta;
pub mod entities;
mod pull;
mod repair;
mod sink;
mod watermark;

pub use capability::*;
pub use cascade::*;
pub use context::*;
pub use delta::*;
pub use pull::*;
pub use repair::*;
pub use sink::*;
pub use watermark::*;

use thiserror::Error;

use crate::db::DbError;

/// Sync engine errors.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Malformed request: {0}")]
    Malformed(String),

    #[error("Invalid watermark: {0}")]
    Watermark(#[from] TimestampError),

    #[error("Invalid {key} record: {reason}")]
    InvalidRecord { key: &'static str, reason: String },

    #[error("Record type registered twice: {0}")]
    DuplicateKey(String),

    #[error("Storage error: {0}")]
    Db(#[from] DbError),
}

impl From<rusqlite::Error> for SyncError {
    fn from(err: rusqlite::Error) -> Self {
        SyncError::Db(DbError::Sqlite(err))
    }
}

impl SyncError {
    /// Whether the caller sent something unusable (as opposed to a
    /// failure while applying).
    pub fn is_client_error(&self) -> bool {
        matches!(self, SyncError::Malformed(_) | SyncError::Watermark(_))
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
