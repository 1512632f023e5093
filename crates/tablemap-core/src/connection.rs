//! The database capability the engine runs on.
//!
//! Drivers implement [`Connection`] (usually over a pool) and a matching transaction type.
//! All calls block the calling thread until the database answers.

use crate::error::{Error, MultipleRowsError, Result};
use crate::row::Row;
use crate::value::Value;

/// Statement execution shared by connections and transactions.
///
/// `params` are already in placeholder order; named markers have been expanded before the
/// driver sees the SQL.
pub trait Queryable {
    /// Run a statement that returns rows.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Run a statement and return the number of affected rows.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Run an INSERT and return the engine's last generated key.
    fn insert(&self, sql: &str, params: &[Value]) -> Result<i64>;

    /// Run a query expected to return at most one row.
    fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        let mut rows = self.query(sql, params)?;
        match rows.len() {
            0 | 1 => Ok(rows.pop()),
            count => Err(Error::MultipleRows(MultipleRowsError {
                count,
                ..Default::default()
            })),
        }
    }
}

/// A transaction handle. Consumed by commit or rollback.
pub trait TransactionOps: Queryable {
    fn commit(self) -> Result<()>;
    fn rollback(self) -> Result<()>;
}

/// A database handle that can start transactions.
pub trait Connection: Queryable + Send + Sync {
    type Tx<'conn>: TransactionOps
    where
        Self: 'conn;

    /// Start a transaction on a dedicated connection.
    fn begin(&self) -> Result<Self::Tx<'_>>;
}

impl<Q: Queryable + ?Sized> Queryable for &Q {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        (**self).query(sql, params)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        (**self).execute(sql, params)
    }

    fn insert(&self, sql: &str, params: &[Value]) -> Result<i64> {
        (**self).insert(sql, params)
    }
}
