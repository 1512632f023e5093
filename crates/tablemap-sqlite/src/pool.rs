//! A small blocking pool of rusqlite connections.

use std::ops::Deref;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use rusqlite::{Connection, OpenFlags};
use tablemap_core::{ConnectionError, ConnectionErrorKind, Error, Result};

use crate::config::SqliteConfig;
use crate::convert::connection_error;

#[derive(Debug, Default)]
struct PoolState {
    idle: Vec<Connection>,
    /// Connections in existence, idle or checked out.
    open: usize,
}

/// Connections are created lazily up to the configured size and handed out through
/// [`PooledConnection`] guards that return them on drop.
#[derive(Debug)]
pub(crate) struct Pool {
    config: SqliteConfig,
    state: Mutex<PoolState>,
    available: Condvar,
}

impl Pool {
    /// Build the pool and open its first connection, so a bad path fails here.
    pub(crate) fn open(config: SqliteConfig) -> Result<Self> {
        let first = open_connection(&config)?;
        tracing::info!(
            path = %config.path.display(),
            max_connections = config.pool_size(),
            "opened SQLite database"
        );
        Ok(Self {
            config,
            state: Mutex::new(PoolState {
                idle: vec![first],
                open: 1,
            }),
            available: Condvar::new(),
        })
    }

    pub(crate) fn config(&self) -> &SqliteConfig {
        &self.config
    }

    /// Check out a connection, waiting up to the busy timeout for one to come back.
    pub(crate) fn acquire(&self) -> Result<PooledConnection<'_>> {
        let deadline = Instant::now() + self.config.busy_timeout_duration();
        let mut state = self.lock();
        loop {
            if let Some(conn) = state.idle.pop() {
                return Ok(PooledConnection {
                    pool: self,
                    conn: Some(conn),
                });
            }

            if state.open < self.config.pool_size() {
                state.open += 1;
                drop(state);
                return match open_connection(&self.config) {
                    Ok(conn) => {
                        tracing::debug!("opened pooled connection");
                        Ok(PooledConnection {
                            pool: self,
                            conn: Some(conn),
                        })
                    }
                    Err(e) => {
                        self.lock().open -= 1;
                        self.available.notify_one();
                        Err(e)
                    }
                };
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::warn!(open = state.open, "timed out waiting for a connection");
                return Err(Error::Connection(ConnectionError {
                    kind: ConnectionErrorKind::Pool,
                    message: format!(
                        "no connection available within {}ms",
                        self.config.busy_timeout_ms
                    ),
                    source: None,
                }));
            }
            state = self
                .available
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    fn release(&self, conn: Connection) {
        self.lock().idle.push(conn);
        self.available.notify_one();
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A checked-out connection. Returned to the pool on drop.
#[derive(Debug)]
pub(crate) struct PooledConnection<'p> {
    pool: &'p Pool,
    conn: Option<Connection>,
}

impl Deref for PooledConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        // Only `Drop` takes the connection out.
        self.conn
            .as_ref()
            .unwrap_or_else(|| unreachable!("pooled connection used after release"))
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}

fn open_connection(config: &SqliteConfig) -> Result<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX
        | OpenFlags::SQLITE_OPEN_URI;
    let conn = Connection::open_with_flags(&config.path, flags).map_err(|e| {
        connection_error(
            ConnectionErrorKind::Open,
            format!("failed to open {}", config.path.display()),
            e,
        )
    })?;
    apply_pragmas(&conn, config)
        .map_err(|e| connection_error(ConnectionErrorKind::Open, "failed to configure", e))?;
    Ok(conn)
}

fn apply_pragmas(conn: &Connection, config: &SqliteConfig) -> rusqlite::Result<()> {
    conn.busy_timeout(config.busy_timeout_duration())?;
    conn.pragma_update(None, "foreign_keys", config.foreign_keys)?;
    if !config.is_memory() {
        let mode: String = conn.pragma_update_and_check(
            None,
            "journal_mode",
            config.journal_mode.pragma_value(),
            |row| row.get(0),
        )?;
        tracing::debug!(journal_mode = %mode, "configured connection");
    }
    Ok(())
}
