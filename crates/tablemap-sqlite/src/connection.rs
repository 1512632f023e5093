//! [`Connection`] and transaction implementations over rusqlite.

use std::path::Path;
use std::sync::Arc;

use rusqlite::params_from_iter;
use tablemap_core::{Connection, Queryable, Result, Row, TransactionOps, Value};

use crate::config::SqliteConfig;
use crate::convert::{SqlParam, from_value_ref, query_error};
use crate::pool::{Pool, PooledConnection};

/// A pooled SQLite database.
///
/// Each statement checks a connection out of the pool for its own duration. Transactions
/// hold one connection until they finish.
#[derive(Debug)]
pub struct SqliteConnection {
    pool: Pool,
}

impl SqliteConnection {
    pub fn open(config: SqliteConfig) -> Result<Self> {
        Ok(Self {
            pool: Pool::open(config)?,
        })
    }

    /// A private in-memory database.
    pub fn open_memory() -> Result<Self> {
        Self::open(SqliteConfig::memory())
    }

    /// A database file with default settings (WAL journal).
    pub fn open_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(SqliteConfig::file(path))
    }

    pub fn config(&self) -> &SqliteConfig {
        self.pool.config()
    }
}

impl Queryable for SqliteConnection {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        run_query(&*self.pool.acquire()?, sql, params)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        run_execute(&*self.pool.acquire()?, sql, params)
    }

    fn insert(&self, sql: &str, params: &[Value]) -> Result<i64> {
        run_insert(&*self.pool.acquire()?, sql, params)
    }
}

impl Connection for SqliteConnection {
    type Tx<'conn> = SqliteTransaction<'conn>;

    fn begin(&self) -> Result<SqliteTransaction<'_>> {
        let conn = self.pool.acquire()?;
        // Write lock up front: a deferred lock upgrade does not wait out the busy timeout.
        conn.execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| query_error(e, "BEGIN IMMEDIATE"))?;
        Ok(SqliteTransaction {
            conn,
            finished: false,
        })
    }
}

/// A transaction on one pooled connection. Rolls back on drop unless committed.
#[derive(Debug)]
pub struct SqliteTransaction<'p> {
    conn: PooledConnection<'p>,
    finished: bool,
}

impl SqliteTransaction<'_> {
    fn finish(&mut self, sql: &str) -> Result<()> {
        self.conn
            .execute_batch(sql)
            .map_err(|e| query_error(e, sql))?;
        self.finished = true;
        Ok(())
    }
}

impl Queryable for SqliteTransaction<'_> {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        run_query(&*self.conn, sql, params)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        run_execute(&*self.conn, sql, params)
    }

    fn insert(&self, sql: &str, params: &[Value]) -> Result<i64> {
        run_insert(&*self.conn, sql, params)
    }
}

impl TransactionOps for SqliteTransaction<'_> {
    fn commit(mut self) -> Result<()> {
        self.finish("COMMIT")
    }

    fn rollback(mut self) -> Result<()> {
        self.finish("ROLLBACK")
    }
}

impl Drop for SqliteTransaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!("rolling back unfinished SQLite transaction");
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                tracing::warn!(error = %e, "rollback failed");
            }
        }
    }
}

fn run_query(conn: &rusqlite::Connection, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
    let mut stmt = conn.prepare_cached(sql).map_err(|e| query_error(e, sql))?;
    let columns: Arc<[String]> = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();

    let mut rows = stmt
        .query(params_from_iter(params.iter().map(SqlParam)))
        .map_err(|e| query_error(e, sql))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(|e| query_error(e, sql))? {
        let values = (0..columns.len())
            .map(|i| row.get_ref(i).map(from_value_ref))
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| query_error(e, sql))?;
        out.push(Row::new(Arc::clone(&columns), values));
    }
    tracing::trace!(rows = out.len(), "query complete");
    Ok(out)
}

fn run_execute(conn: &rusqlite::Connection, sql: &str, params: &[Value]) -> Result<u64> {
    let mut stmt = conn.prepare_cached(sql).map_err(|e| query_error(e, sql))?;
    let changed = stmt
        .execute(params_from_iter(params.iter().map(SqlParam)))
        .map_err(|e| query_error(e, sql))?;
    Ok(changed as u64)
}

fn run_insert(conn: &rusqlite::Connection, sql: &str, params: &[Value]) -> Result<i64> {
    run_execute(conn, sql, params)?;
    Ok(conn.last_insert_rowid())
}
