//! Result rows.

use std::sync::Arc;

use crate::error::{BindError, BindErrorKind, Result};
use crate::value::{FromValue, Value};

/// One row of a result set. Column names are shared between all rows of one query.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Create a row. `values` must line up with `columns`.
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Column names in result order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Shared handle to the column names.
    pub fn column_names(&self) -> Arc<[String]> {
        Arc::clone(&self.columns)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at a column index.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Value of the first column whose name matches case-insensitively.
    pub fn get_named(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .and_then(|i| self.values.get(i))
    }

    /// Typed value of a named column.
    pub fn try_get<T: FromValue>(&self, name: &str) -> Result<T> {
        let value = self.get_named(name).cloned().ok_or_else(|| {
            BindError::new(BindErrorKind::UnmatchedColumn, "no such column in row").column(name)
        })?;
        T::from_value(value)
    }

    /// Consume the row, yielding its values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}
