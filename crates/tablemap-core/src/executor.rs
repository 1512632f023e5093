//! The executor contract shared by the top-level map and transactions.

use crate::error::Result;
use crate::params::Params;
use crate::record::{Record, RecordType};
use crate::registry::Registry;
use crate::row::Row;
use crate::value::Value;

/// CRUD and ad hoc execution against one database handle.
///
/// This trait is object safe so hooks can receive whichever executor is running the
/// current operation. Typed selects live in an extension trait over it.
///
/// Multi-record calls take records of one registered type. They run record by record
/// without an implicit transaction; a failure stops the call and reports the failing
/// position.
pub trait SqlExecutor {
    /// Registry the executor maps records with.
    fn registry(&self) -> &Registry;

    /// This executor as a trait object.
    fn as_executor(&self) -> &dyn SqlExecutor;

    /// Insert records, writing generated keys and initial versions back.
    fn insert(&self, records: &mut [&mut dyn Record]) -> Result<()>;

    /// Update records by primary key. Returns the number of rows changed.
    fn update(&self, records: &mut [&mut dyn Record]) -> Result<u64>;

    /// Delete records by primary key. Returns the number of rows removed.
    fn delete(&self, records: &mut [&mut dyn Record]) -> Result<u64>;

    /// Load the row with the given key values into `dest`.
    fn get(&self, dest: &mut dyn Record, keys: &[Value]) -> Result<()>;

    /// Whether a row with the given key values exists.
    fn exists(&self, record_type: RecordType, keys: &[Value]) -> Result<bool>;

    /// Run an ad hoc statement, returning affected rows.
    fn exec(&self, sql: &str, params: &Params<'_>) -> Result<u64>;

    /// Run an ad hoc query, returning the materialized rows.
    fn query(&self, sql: &str, params: &Params<'_>) -> Result<Vec<Row>>;
}
