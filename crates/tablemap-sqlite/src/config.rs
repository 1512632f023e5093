//! SQLite connection configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

const MEMORY_PATH: &str = ":memory:";

/// SQLite `journal_mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalMode {
    /// Write-ahead log. Readers do not block the writer.
    #[default]
    Wal,
    Delete,
    Truncate,
    Memory,
}

impl JournalMode {
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
            Self::Truncate => "truncate",
            Self::Memory => "memory",
        }
    }
}

/// Configuration for [`SqliteConnection`](crate::SqliteConnection).
///
/// In-memory databases are private to one SQLite connection, so their pool is always
/// capped at a single connection and the journal mode is left alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// Database file, or `:memory:`.
    pub path: PathBuf,
    pub journal_mode: JournalMode,
    /// How long a statement waits on a locked database, and how long a caller waits for
    /// a pooled connection.
    pub busy_timeout_ms: u64,
    /// Pool size for file databases.
    pub max_connections: usize,
    pub foreign_keys: bool,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(MEMORY_PATH),
            journal_mode: JournalMode::Wal,
            busy_timeout_ms: 5_000,
            max_connections: 4,
            foreign_keys: true,
        }
    }
}

impl SqliteConfig {
    /// A private in-memory database.
    pub fn memory() -> Self {
        Self::default()
    }

    /// A database file, created if missing.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    pub fn journal_mode(mut self, mode: JournalMode) -> Self {
        self.journal_mode = mode;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    pub fn is_memory(&self) -> bool {
        self.path.as_os_str() == MEMORY_PATH
    }

    pub(crate) fn busy_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Pool size after the in-memory cap; never zero.
    pub(crate) fn pool_size(&self) -> usize {
        if self.is_memory() {
            1
        } else {
            self.max_connections.max(1)
        }
    }
}
