//! Sync engine configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the sync service.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// SQLite file to open. `None` keeps the store in memory.
    pub database_path: Option<PathBuf>,
    /// How long a writer waits on a locked database.
    pub busy_timeout: Duration,
    /// Upper bound on records in one push, across all record types.
    pub max_push_records: Option<usize>,
}

impl SyncConfig {
    /// Creates a configuration for the database file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Creates an in-memory configuration.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Sets the busy timeout.
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Caps the number of records accepted per push.
    pub fn with_max_push_records(mut self, max: usize) -> Self {
        self.max_push_records = Some(max);
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            busy_timeout: Duration::from_secs(5),
            max_push_records: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert!(config.database_path.is_none());
        assert_eq!(config.busy_timeout, Duration::from_secs(5));
        assert!(config.max_push_records.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = SyncConfig::new("/var/lib/clinic/sync.db")
            .with_busy_timeout(Duration::from_millis(250))
            .with_max_push_records(10_000);

        assert_eq!(
            config.database_path,
            Some(PathBuf::from("/var/lib/clinic/sync.db"))
        );
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert_eq!(config.max_push_records, Some(10_000));
    }
}
