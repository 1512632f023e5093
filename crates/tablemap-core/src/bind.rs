//! Binding result rows onto records and scalars.
//!
//! Record binding is strict: every result column must match exactly one mapped column of
//! the destination (case-insensitively), otherwise the whole bind fails. Scalars take a
//! single-column result.

use crate::error::{BindError, BindErrorKind, Error, Result};
use crate::executor::SqlExecutor;
use crate::record::{Record, RecordType};
use crate::registry::Registry;
use crate::row::Row;
use crate::table::ColumnMap;
use crate::value::{FromValue, Value};

/// A destination for query results.
pub trait Bindable: Sized {
    /// Convert a fully materialized result set.
    fn bind_rows(rows: Vec<Row>, registry: &Registry) -> Result<Vec<Self>>;

    /// Runs once per bound value after the whole result set was converted.
    fn after_bind(&mut self, _exec: &dyn SqlExecutor) -> Result<()> {
        Ok(())
    }
}

impl<T: Record + Default> Bindable for T {
    fn bind_rows(rows: Vec<Row>, registry: &Registry) -> Result<Vec<Self>> {
        let Some(first) = rows.first() else {
            return Ok(Vec::new());
        };
        let record_type = RecordType::of::<T>();
        let shape = registry.shape(record_type)?;
        let columns = shape.columns();
        let targets = match_columns(first.columns(), columns, record_type.name())?;

        rows.into_iter()
            .map(|row| {
                let mut record = T::default();
                apply_row(&mut record, row, columns, &targets)?;
                Ok(record)
            })
            .collect()
    }

    fn after_bind(&mut self, exec: &dyn SqlExecutor) -> Result<()> {
        match self.hooks() {
            Some(hooks) => hooks.post_get(exec),
            None => Ok(()),
        }
    }
}

/// Bind one row onto an existing record.
pub fn bind_into(dest: &mut dyn Record, row: Row, registry: &Registry) -> Result<()> {
    let record_type = dest.record_type();
    let shape = registry.shape(record_type)?;
    let columns = shape.columns();
    let targets = match_columns(row.columns(), columns, record_type.name())?;
    apply_row(dest, row, columns, &targets)
}

/// Map each result column to the index of the mapped column it fills.
fn match_columns(result: &[String], columns: &[ColumnMap], type_name: &str) -> Result<Vec<usize>> {
    let mut targets: Vec<usize> = Vec::with_capacity(result.len());
    for name in result {
        let target = columns
            .iter()
            .position(|c| c.is_mapped() && c.column_name.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                BindError::new(
                    BindErrorKind::UnmatchedColumn,
                    format!("no mapped field in {type_name} for result column"),
                )
                .column(name.as_str())
            })?;
        if targets.contains(&target) {
            return Err(BindError::new(
                BindErrorKind::DuplicateColumn,
                format!("result column appears more than once for {type_name}"),
            )
            .column(name.as_str())
            .into());
        }
        targets.push(target);
    }
    Ok(targets)
}

fn apply_row(
    dest: &mut dyn Record,
    row: Row,
    columns: &[ColumnMap],
    targets: &[usize],
) -> Result<()> {
    for (value, &target) in row.into_values().into_iter().zip(targets) {
        let column = &columns[target];
        dest.set_field_value(&column.field_path, value)
            .map_err(|e| match e {
                Error::Bind(err) if err.column.is_none() => {
                    Error::Bind(err.column(column.column_name.as_str()))
                }
                other => other,
            })?;
    }
    Ok(())
}

fn bind_scalars<T: FromValue>(rows: Vec<Row>) -> Result<Vec<T>> {
    rows.into_iter()
        .map(|row| {
            if row.len() != 1 {
                return Err(BindError::new(
                    BindErrorKind::ColumnCount,
                    format!("scalar result needs exactly one column, got {}", row.len()),
                )
                .into());
            }
            let value = row.into_values().pop().unwrap_or(Value::Null);
            T::from_value(value)
        })
        .collect()
}

macro_rules! impl_scalar_bindable {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Bindable for $ty {
                fn bind_rows(rows: Vec<Row>, _registry: &Registry) -> Result<Vec<Self>> {
                    bind_scalars(rows)
                }
            }
        )*
    };
}

impl_scalar_bindable!(
    bool,
    i16,
    i32,
    i64,
    u32,
    f32,
    f64,
    String,
    Vec<u8>,
    serde_json::Value,
    Value,
);

impl<T: FromValue> Bindable for Option<T> {
    fn bind_rows(rows: Vec<Row>, _registry: &Registry) -> Result<Vec<Self>> {
        bind_scalars(rows)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::record::test_records::{Audit, Invoice};

    fn rows(columns: &[&str], data: Vec<Vec<Value>>) -> Vec<Row> {
        let columns: Arc<[String]> = columns.iter().map(|c| (*c).to_string()).collect();
        data.into_iter()
            .map(|values| Row::new(Arc::clone(&columns), values))
            .collect()
    }

    #[test]
    fn test_bind_registered_record() {
        let mut registry = Registry::new();
        registry.register::<Invoice>("invoice").unwrap();
        let rows = rows(
            &["ID", "memo", "created_by", "version"],
            vec![vec![
                Value::BigInt(1),
                Value::Text("first".into()),
                Value::Text("ann".into()),
                Value::BigInt(3),
            ]],
        );
        let bound = Invoice::bind_rows(rows, &registry).unwrap();
        assert_eq!(bound.len(), 1);
        assert_eq!(bound[0].id, Some(1));
        assert_eq!(bound[0].memo, "first");
        assert_eq!(bound[0].audit.created_by, "ann");
        assert_eq!(bound[0].audit.version, 3);
    }

    #[test]
    fn test_unmatched_column_fails() {
        let registry = Registry::new();
        let rows = rows(
            &["created_by", "version", "extra_unmapped"],
            vec![vec![Value::Text("x".into()), Value::BigInt(1), Value::Null]],
        );
        let err = Audit::bind_rows(rows, &registry).unwrap_err();
        assert_eq!(err.bind_kind(), Some(BindErrorKind::UnmatchedColumn));
        assert!(err.to_string().contains("extra_unmapped"));
    }

    #[test]
    fn test_transient_column_is_not_bindable() {
        let mut registry = Registry::new();
        registry.register::<Invoice>("invoice").unwrap();
        let rows = rows(&["scratch"], vec![vec![Value::Text("x".into())]]);
        let err = Invoice::bind_rows(rows, &registry).unwrap_err();
        assert_eq!(err.bind_kind(), Some(BindErrorKind::UnmatchedColumn));
    }

    #[test]
    fn test_duplicate_column_fails() {
        let registry = Registry::new();
        let rows = rows(
            &["version", "VERSION"],
            vec![vec![Value::BigInt(1), Value::BigInt(2)]],
        );
        let err = Audit::bind_rows(rows, &registry).unwrap_err();
        assert_eq!(err.bind_kind(), Some(BindErrorKind::DuplicateColumn));
    }

    #[test]
    fn test_conversion_error_names_column() {
        let registry = Registry::new();
        let rows = rows(&["version"], vec![vec![Value::Text("x".into())]]);
        let err = Audit::bind_rows(rows, &registry).unwrap_err();
        match err {
            Error::Bind(e) => assert_eq!(e.column.as_deref(), Some("version")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_scalars() {
        let registry = Registry::new();
        let data = rows(&["n"], vec![vec![Value::BigInt(4)], vec![Value::Null]]);
        let values = Option::<i64>::bind_rows(data, &registry).unwrap();
        assert_eq!(values, vec![Some(4), None]);

        let data = rows(&["a", "b"], vec![vec![Value::BigInt(1), Value::BigInt(2)]]);
        let err = i64::bind_rows(data, &registry).unwrap_err();
        assert_eq!(err.bind_kind(), Some(BindErrorKind::ColumnCount));
    }

    #[test]
    fn test_bind_into_existing_record() {
        let registry = Registry::new();
        let mut audit = Audit::default();
        let row = rows(&["version"], vec![vec![Value::BigInt(9)]])
            .pop()
            .unwrap();
        bind_into(&mut audit, row, &registry).unwrap();
        assert_eq!(audit.version, 9);
    }
}
