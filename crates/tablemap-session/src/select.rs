//! Typed selects over any [`SqlExecutor`].

use tablemap_core::{
    BindError, BindErrorKind, Bindable, Error, FromValue, MultipleRowsError, NotFoundError,
    Params, Result, Row, SqlExecutor, Value,
};

/// Select helpers available on [`DbMap`](crate::DbMap), [`Transaction`](crate::Transaction)
/// and the `&dyn SqlExecutor` handed to hooks.
///
/// Every helper consumes the whole result set before returning.
pub trait SelectExt: SqlExecutor {
    /// Bind every row into a `T`: a record (registered or not) or a single-column scalar.
    fn select<T: Bindable>(&self, sql: &str, params: &Params<'_>) -> Result<Vec<T>> {
        let mut out = Vec::new();
        self.select_into(&mut out, sql, params)?;
        Ok(out)
    }

    /// Append every bound row to `dest`. On error `dest` is left as it was.
    fn select_into<T: Bindable>(
        &self,
        dest: &mut Vec<T>,
        sql: &str,
        params: &Params<'_>,
    ) -> Result<()> {
        let rows = self.query(sql, params)?;
        let mut bound = T::bind_rows(rows, self.registry())?;
        for item in &mut bound {
            item.after_bind(self.as_executor())?;
        }
        dest.append(&mut bound);
        Ok(())
    }

    /// Exactly one row bound into a `T`.
    fn select_one<T: Bindable>(&self, sql: &str, params: &Params<'_>) -> Result<T> {
        let rows = self.query(sql, params)?;
        match rows.len() {
            0 => Err(Error::NotFound(NotFoundError {
                table: None,
                keys: Vec::new(),
                sql: Some(sql.to_string()),
            })),
            1 => {
                let mut bound = T::bind_rows(rows, self.registry())?;
                let mut item = bound.pop().ok_or_else(|| {
                    Error::NotFound(NotFoundError {
                        sql: Some(sql.to_string()),
                        ..NotFoundError::default()
                    })
                })?;
                item.after_bind(self.as_executor())?;
                Ok(item)
            }
            count => Err(Error::MultipleRows(MultipleRowsError {
                count,
                ..MultipleRowsError::default()
            })),
        }
    }

    /// The single column of the single result row as an integer; 0 when there is no row.
    fn select_int(&self, sql: &str, params: &Params<'_>) -> Result<i64> {
        Ok(self.select_nullable_int(sql, params)?.unwrap_or(0))
    }

    fn select_nullable_int(&self, sql: &str, params: &Params<'_>) -> Result<Option<i64>> {
        scalar(self.query(sql, params)?)
    }

    /// The single result value as a float; 0.0 when there is no row.
    fn select_float(&self, sql: &str, params: &Params<'_>) -> Result<f64> {
        Ok(self.select_nullable_float(sql, params)?.unwrap_or(0.0))
    }

    fn select_nullable_float(&self, sql: &str, params: &Params<'_>) -> Result<Option<f64>> {
        scalar(self.query(sql, params)?)
    }

    /// The single result value as a string; empty when there is no row.
    fn select_str(&self, sql: &str, params: &Params<'_>) -> Result<String> {
        Ok(self.select_nullable_str(sql, params)?.unwrap_or_default())
    }

    fn select_nullable_str(&self, sql: &str, params: &Params<'_>) -> Result<Option<String>> {
        scalar(self.query(sql, params)?)
    }
}

impl<E: SqlExecutor + ?Sized> SelectExt for E {}

/// Zero rows and SQL NULL both read as `None`.
fn scalar<T: FromValue>(mut rows: Vec<Row>) -> Result<Option<T>> {
    if rows.len() > 1 {
        return Err(Error::MultipleRows(MultipleRowsError {
            count: rows.len(),
            ..MultipleRowsError::default()
        }));
    }
    let Some(row) = rows.pop() else {
        return Ok(None);
    };
    if row.len() != 1 {
        return Err(BindError::new(
            BindErrorKind::ColumnCount,
            format!("scalar result needs exactly one column, got {}", row.len()),
        )
        .into());
    }
    match row.into_values().pop() {
        None | Some(Value::Null) => Ok(None),
        Some(value) => T::from_value(value).map(Some),
    }
}
