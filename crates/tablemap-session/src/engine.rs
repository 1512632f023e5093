//! The CRUD engine shared by [`DbMap`](crate::DbMap) and [`Transaction`](crate::Transaction).
//!
//! Per record the engine runs: pre hook, SQL, write-back of generated key or version,
//! post hook. A hook error or database error stops that record; there are no retries.

use tablemap_core::{
    BatchError, BindError, BindErrorKind, Error, MultipleRowsError, NotFoundError,
    OptimisticLockError, Params, QueryError, QueryErrorKind, Queryable, Record, RecordType,
    Registry, Result, Row, SqlExecutor, TableMap, TypeMismatchError, Value, bind_into,
};
use tablemap_query::builder::{current_version, key_values};
use tablemap_query::{Dialect, KeyStrategy, Statement, StatementBuilder, named};

use crate::config::DbMapConfig;
use crate::plan::{PlanCache, StatementKind};

/// Borrowed view of everything one operation needs.
pub(crate) struct Engine<'e> {
    pub(crate) registry: &'e Registry,
    pub(crate) dialect: &'e dyn Dialect,
    pub(crate) conn: &'e dyn Queryable,
    pub(crate) config: &'e DbMapConfig,
    pub(crate) plans: &'e PlanCache,
    /// Executor handed to hooks.
    pub(crate) exec: &'e dyn SqlExecutor,
}

impl<'e> Engine<'e> {
    // ========================================================================
    // Insert / Update / Delete
    // ========================================================================

    pub(crate) fn insert(&self, records: &mut [&mut dyn Record]) -> Result<()> {
        let Some(table) = self.table_for_records(records)? else {
            return Ok(());
        };
        let stmt = self.plan(table, StatementKind::Insert)?;
        let total = records.len();
        for (position, record) in records.iter_mut().enumerate() {
            self.insert_one(table, &stmt, &mut **record)
                .map_err(|e| batch_error(e, position, total, table))?;
        }
        tracing::debug!(table = %table.qualified_name(), rows = total, "inserted");
        Ok(())
    }

    fn insert_one(&self, table: &TableMap, stmt: &Statement, record: &mut dyn Record) -> Result<()> {
        if let Some(hooks) = record.hooks() {
            hooks.pre_insert(self.exec)?;
        }
        if let Some((_, version)) = table.version_column() {
            record.set_field_value(&version.field_path, Value::BigInt(1))?;
        }

        let values = stmt.bind_record(table, record)?;
        self.log_statement(&stmt.sql, &values);

        match stmt.generated_key {
            Some(key) => {
                let id = match key.strategy {
                    KeyStrategy::LastInsertId => Value::BigInt(self.conn.insert(&stmt.sql, &values)?),
                    KeyStrategy::Returning => self
                        .conn
                        .query_one(&stmt.sql, &values)?
                        .and_then(|row| row.get(0).cloned())
                        .ok_or_else(|| {
                            Error::Query(QueryError {
                                kind: QueryErrorKind::Database,
                                message: format!(
                                    "insert into {} returned no generated key",
                                    table.qualified_name()
                                ),
                                sql: Some(stmt.sql.clone()),
                                source: None,
                            })
                        })?,
                };
                let column = &table.columns()[key.column];
                record.set_field_value(&column.field_path, id)?;
            }
            None => {
                self.conn.execute(&stmt.sql, &values)?;
            }
        }

        if let Some(hooks) = record.hooks() {
            hooks.post_insert(self.exec)?;
        }
        Ok(())
    }

    pub(crate) fn update(&self, records: &mut [&mut dyn Record]) -> Result<u64> {
        let Some(table) = self.table_for_records(records)? else {
            return Ok(0);
        };
        let stmt = self.plan(table, StatementKind::Update)?;
        let total = records.len();
        let mut changed = 0;
        for (position, record) in records.iter_mut().enumerate() {
            changed += self
                .update_one(table, &stmt, &mut **record)
                .map_err(|e| batch_error(e, position, total, table))?;
        }
        tracing::debug!(table = %table.qualified_name(), rows = changed, "updated");
        Ok(changed)
    }

    fn update_one(&self, table: &TableMap, stmt: &Statement, record: &mut dyn Record) -> Result<u64> {
        if let Some(hooks) = record.hooks() {
            hooks.pre_update(self.exec)?;
        }

        let values = stmt.bind_record(table, record)?;
        self.log_statement(&stmt.sql, &values);
        let rows = self.conn.execute(&stmt.sql, &values)?;

        if let Some((_, version)) = table.version_column() {
            if rows == 0 {
                return Err(self.lock_error(table, record)?);
            }
            let next = current_version(table, record)? + 1;
            record.set_field_value(&version.field_path, Value::BigInt(next))?;
        }

        if let Some(hooks) = record.hooks() {
            hooks.post_update(self.exec)?;
        }
        Ok(rows)
    }

    pub(crate) fn delete(&self, records: &mut [&mut dyn Record]) -> Result<u64> {
        let Some(table) = self.table_for_records(records)? else {
            return Ok(0);
        };
        let stmt = self.plan(table, StatementKind::Delete)?;
        let total = records.len();
        let mut removed = 0;
        for (position, record) in records.iter_mut().enumerate() {
            removed += self
                .delete_one(table, &stmt, &mut **record)
                .map_err(|e| batch_error(e, position, total, table))?;
        }
        tracing::debug!(table = %table.qualified_name(), rows = removed, "deleted");
        Ok(removed)
    }

    fn delete_one(&self, table: &TableMap, stmt: &Statement, record: &mut dyn Record) -> Result<u64> {
        if let Some(hooks) = record.hooks() {
            hooks.pre_delete(self.exec)?;
        }

        let values = stmt.bind_record(table, record)?;
        self.log_statement(&stmt.sql, &values);
        let rows = self.conn.execute(&stmt.sql, &values)?;

        if rows == 0 && table.version_column().is_some() {
            return Err(self.lock_error(table, record)?);
        }

        if let Some(hooks) = record.hooks() {
            hooks.post_delete(self.exec)?;
        }
        Ok(rows)
    }

    /// Describe a version mismatch by probing the stored row.
    fn lock_error(&self, table: &TableMap, record: &dyn Record) -> Result<Error> {
        let keys = key_values(table, record)?;
        let local_version = current_version(table, record)?;

        let mut row_exists = false;
        let mut remote_version = None;
        if let Some(probe) = StatementBuilder::new(table, self.dialect).version_probe()? {
            let found = probe.bind_record(table, record).and_then(|values| {
                self.log_statement(&probe.sql, &values);
                self.conn.query_one(&probe.sql, &values)
            });
            match found {
                Ok(Some(row)) => {
                    row_exists = true;
                    remote_version = row.get(0).and_then(Value::as_i64);
                }
                Ok(None) => {}
                // The lock failure is still reported; the probe only adds detail.
                Err(err) => {
                    tracing::warn!(table = %table.qualified_name(), error = %err, "version probe failed");
                }
            }
        }

        tracing::warn!(
            table = %table.qualified_name(),
            local_version,
            ?remote_version,
            row_exists,
            "optimistic lock failed"
        );
        Ok(Error::OptimisticLock(OptimisticLockError {
            table: table.qualified_name(),
            keys,
            local_version,
            row_exists,
            remote_version,
        }))
    }

    // ========================================================================
    // Get / Exists
    // ========================================================================

    pub(crate) fn get(&self, dest: &mut dyn Record, keys: &[Value]) -> Result<()> {
        let table = self.registry.table_for(dest.record_type())?;
        check_key_count(table, keys)?;
        let stmt = self.plan(table, StatementKind::Get)?;
        let values = stmt.bind_keys(keys)?;
        self.log_statement(&stmt.sql, &values);

        let mut rows = self.conn.query(&stmt.sql, &values)?;
        let row = match rows.len() {
            1 => rows.pop(),
            _ => None,
        };
        let Some(row) = row else {
            return Err(row_count_error(table, keys, &stmt.sql, rows.len()));
        };

        bind_into(dest, row, self.registry)?;
        if let Some(hooks) = dest.hooks() {
            hooks.post_get(self.exec)?;
        }
        Ok(())
    }

    pub(crate) fn exists(&self, record_type: RecordType, keys: &[Value]) -> Result<bool> {
        let table = self.registry.table_for(record_type)?;
        check_key_count(table, keys)?;
        let stmt = self.plan(table, StatementKind::Exists)?;
        let values = stmt.bind_keys(keys)?;
        self.log_statement(&stmt.sql, &values);

        let count = self
            .conn
            .query_one(&stmt.sql, &values)?
            .and_then(|row| row.get(0).and_then(Value::as_i64))
            .unwrap_or(0);
        Ok(count > 0)
    }

    // ========================================================================
    // Ad hoc SQL
    // ========================================================================

    pub(crate) fn exec(&self, sql: &str, params: &Params<'_>) -> Result<u64> {
        let expanded = named::expand(sql, params, self.dialect, self.registry)?;
        self.log_statement(&expanded.sql, &expanded.values);
        self.conn.execute(&expanded.sql, &expanded.values)
    }

    pub(crate) fn query(&self, sql: &str, params: &Params<'_>) -> Result<Vec<Row>> {
        let expanded = named::expand(sql, params, self.dialect, self.registry)?;
        self.log_statement(&expanded.sql, &expanded.values);
        self.conn.query(&expanded.sql, &expanded.values)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// The table shared by all records of a call. `None` for an empty call.
    fn table_for_records(&self, records: &[&mut dyn Record]) -> Result<Option<&'e TableMap>> {
        let Some(first) = records.first() else {
            return Ok(None);
        };
        let expected = first.record_type();
        for (position, record) in records.iter().enumerate().skip(1) {
            let found = record.record_type();
            if found != expected {
                return Err(Error::TypeMismatch(TypeMismatchError {
                    expected: expected.name(),
                    found: found.name(),
                    position,
                }));
            }
        }
        self.registry.table_for(expected).map(Some)
    }

    fn plan(&self, table: &TableMap, kind: StatementKind) -> Result<std::sync::Arc<Statement>> {
        self.plans.get_or_build(table, kind, || {
            let builder = StatementBuilder::new(table, self.dialect);
            match kind {
                StatementKind::Insert => Ok(builder.insert()),
                StatementKind::Update => builder.update(),
                StatementKind::Delete => builder.delete(),
                StatementKind::Get => builder.get(),
                StatementKind::Exists => builder.exists(),
            }
        })
    }

    fn log_statement(&self, sql: &str, values: &[Value]) {
        match (self.config.log_statements, self.config.log_params) {
            (true, true) => tracing::debug!(dialect = self.dialect.name(), sql, params = ?values, "executing"),
            (true, false) => tracing::debug!(dialect = self.dialect.name(), sql, "executing"),
            (false, _) => tracing::trace!(dialect = self.dialect.name(), sql, "executing"),
        }
    }
}

fn check_key_count(table: &TableMap, keys: &[Value]) -> Result<()> {
    let expected = table.key_count();
    if keys.len() != expected {
        return Err(BindError::new(
            BindErrorKind::ParameterCount,
            format!(
                "{} takes {expected} key value(s), got {}",
                table.qualified_name(),
                keys.len()
            ),
        )
        .into());
    }
    Ok(())
}

fn row_count_error(table: &TableMap, keys: &[Value], sql: &str, count: usize) -> Error {
    if count == 0 {
        Error::NotFound(NotFoundError {
            table: Some(table.qualified_name()),
            keys: keys.to_vec(),
            sql: Some(sql.to_string()),
        })
    } else {
        Error::MultipleRows(MultipleRowsError {
            table: Some(table.qualified_name()),
            keys: keys.to_vec(),
            count,
        })
    }
}

/// Wrap a per-record failure with its position. Single-record calls pass errors through.
fn batch_error(err: Error, position: usize, total: usize, table: &TableMap) -> Error {
    if total == 1 {
        return err;
    }
    tracing::debug!(table = %table.qualified_name(), position, total, "record failed");
    Error::Batch(BatchError {
        position,
        total,
        table: table.qualified_name(),
        source: Box::new(err),
    })
}
