//! Statement generation for mapped tables.
//!
//! [`StatementBuilder`] renders the SQL for Insert, Update, Delete, Get, Exists and the
//! version probe from a [`TableMap`] and a [`Dialect`]. Each statement carries an ordered
//! list of [`ParamSource`]s describing where every placeholder's value comes from, so the
//! SQL can be built once per table and bound many times.

use tablemap_core::{
    BindError, BindErrorKind, Error, Record, RegistrationError, RegistrationErrorKind, Result,
    TableMap, Value,
};

use crate::dialect::{Dialect, KeyStrategy};

/// Where one placeholder's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSource {
    /// The record's field for the column at this index.
    Column(usize),
    /// The record's current version.
    OldVersion,
    /// The record's current version plus one.
    NewVersion,
    /// The caller-supplied key value at this position.
    Key(usize),
}

/// A generated key to read back after INSERT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratedKey {
    /// Index of the auto-increment column.
    pub column: usize,
    pub strategy: KeyStrategy,
}

/// A rendered statement and its parameter plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<ParamSource>,
    /// Only set for INSERT on tables with an auto-increment key.
    pub generated_key: Option<GeneratedKey>,
}

impl Statement {
    /// Resolve the parameter plan against a record.
    pub fn bind_record(&self, table: &TableMap, record: &dyn Record) -> Result<Vec<Value>> {
        self.params
            .iter()
            .map(|source| match *source {
                ParamSource::Column(idx) => column_value(table, idx, record),
                ParamSource::OldVersion => current_version(table, record).map(Value::BigInt),
                ParamSource::NewVersion => {
                    current_version(table, record).map(|v| Value::BigInt(v + 1))
                }
                ParamSource::Key(_) => Err(BindError::new(
                    BindErrorKind::MissingParameter,
                    "statement expects key values, not a record",
                )
                .into()),
            })
            .collect()
    }

    /// Resolve the parameter plan against caller-supplied key values.
    pub fn bind_keys(&self, keys: &[Value]) -> Result<Vec<Value>> {
        self.params
            .iter()
            .map(|source| match *source {
                ParamSource::Key(idx) => keys.get(idx).cloned().ok_or_else(|| {
                    BindError::new(
                        BindErrorKind::ParameterCount,
                        format!("missing key value at position {idx}"),
                    )
                    .into()
                }),
                _ => Err(BindError::new(
                    BindErrorKind::MissingParameter,
                    "statement expects a record, not key values",
                )
                .into()),
            })
            .collect()
    }
}

/// Value of the mapped column at `idx` read from `record`.
pub fn column_value(table: &TableMap, idx: usize, record: &dyn Record) -> Result<Value> {
    let column = &table.columns()[idx];
    record.field_value(&column.field_path).ok_or_else(|| {
        BindError::new(
            BindErrorKind::UnknownField,
            format!("record has no field {}", column.path_string()),
        )
        .column(column.column_name.as_str())
        .into()
    })
}

/// Primary-key values of `record` in key order.
pub fn key_values(table: &TableMap, record: &dyn Record) -> Result<Vec<Value>> {
    table
        .key_columns()
        .map(|(idx, _)| column_value(table, idx, record))
        .collect()
}

/// The record's version as an integer. NULL counts as 0.
pub fn current_version(table: &TableMap, record: &dyn Record) -> Result<i64> {
    let Some((idx, column)) = table.version_column() else {
        return Ok(0);
    };
    match column_value(table, idx, record)? {
        Value::Null => Ok(0),
        value => value.as_i64().ok_or_else(|| {
            BindError::new(
                BindErrorKind::Conversion,
                format!("version holds a non-integer {}", value.type_name()),
            )
            .column(column.column_name.as_str())
            .into()
        }),
    }
}

/// Renders statements for one table in one dialect.
#[derive(Debug, Clone, Copy)]
pub struct StatementBuilder<'a> {
    table: &'a TableMap,
    dialect: &'a dyn Dialect,
}

impl<'a> StatementBuilder<'a> {
    pub fn new(table: &'a TableMap, dialect: &'a dyn Dialect) -> Self {
        Self { table, dialect }
    }

    fn quoted_table(&self) -> String {
        self.dialect
            .quote_table(self.table.schema(), self.table.name())
    }

    fn quote(&self, column: &str) -> String {
        self.dialect.quote_identifier(column)
    }

    /// INSERT over every mapped column except the auto-increment key.
    pub fn insert(&self) -> Statement {
        let mut columns = Vec::new();
        let mut placeholders = Vec::new();
        let mut params = Vec::new();

        for (idx, column) in self.table.mapped_columns() {
            if column.auto_increment {
                continue;
            }
            columns.push(self.quote(&column.column_name));
            params.push(ParamSource::Column(idx));
            placeholders.push(self.dialect.placeholder(params.len()));
        }

        let mut sql = if columns.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", self.quoted_table())
        } else {
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.quoted_table(),
                columns.join(", "),
                placeholders.join(", ")
            )
        };

        let generated_key = self.table.auto_increment_column().map(|(idx, column)| {
            let strategy = self.dialect.key_strategy();
            if strategy == KeyStrategy::Returning {
                sql.push_str(&format!(" RETURNING {}", self.quote(&column.column_name)));
            }
            GeneratedKey {
                column: idx,
                strategy,
            }
        });

        Statement {
            sql,
            params,
            generated_key,
        }
    }

    /// UPDATE of every mapped non-key column, guarded by the version when mapped.
    pub fn update(&self) -> Result<Statement> {
        self.require_keys("update")?;
        let mut params = Vec::new();
        let mut sets = Vec::new();

        for (idx, column) in self.table.mapped_columns() {
            if column.primary_key {
                continue;
            }
            if column.version {
                params.push(ParamSource::NewVersion);
            } else {
                params.push(ParamSource::Column(idx));
            }
            sets.push(format!(
                "{} = {}",
                self.quote(&column.column_name),
                self.dialect.placeholder(params.len())
            ));
        }

        if sets.is_empty() {
            return Err(RegistrationError::new(
                RegistrationErrorKind::MissingPrimaryKey,
                "table has no updatable columns",
            )
            .table(self.table.qualified_name())
            .into());
        }

        let where_clause = self.key_where(&mut params, true, true);
        Ok(Statement {
            sql: format!(
                "UPDATE {} SET {} WHERE {}",
                self.quoted_table(),
                sets.join(", "),
                where_clause
            ),
            params,
            generated_key: None,
        })
    }

    /// DELETE by primary key, guarded by the version when mapped.
    pub fn delete(&self) -> Result<Statement> {
        self.require_keys("delete")?;
        let mut params = Vec::new();
        let where_clause = self.key_where(&mut params, true, true);
        Ok(Statement {
            sql: format!("DELETE FROM {} WHERE {}", self.quoted_table(), where_clause),
            params,
            generated_key: None,
        })
    }

    /// SELECT of every mapped column by primary key.
    pub fn get(&self) -> Result<Statement> {
        self.require_keys("get")?;
        let columns: Vec<String> = self
            .table
            .mapped_columns()
            .map(|(_, c)| self.quote(&c.column_name))
            .collect();
        let mut params = Vec::new();
        let where_clause = self.key_where(&mut params, false, false);
        Ok(Statement {
            sql: format!(
                "SELECT {} FROM {} WHERE {}",
                columns.join(", "),
                self.quoted_table(),
                where_clause
            ),
            params,
            generated_key: None,
        })
    }

    /// Row count by primary key.
    pub fn exists(&self) -> Result<Statement> {
        self.require_keys("exists")?;
        let mut params = Vec::new();
        let where_clause = self.key_where(&mut params, false, false);
        Ok(Statement {
            sql: format!(
                "SELECT COUNT(*) FROM {} WHERE {}",
                self.quoted_table(),
                where_clause
            ),
            params,
            generated_key: None,
        })
    }

    /// The stored version by primary key, bound from a record. `None` without a version column.
    pub fn version_probe(&self) -> Result<Option<Statement>> {
        self.require_keys("probe")?;
        let Some((_, version)) = self.table.version_column() else {
            return Ok(None);
        };
        let mut params = Vec::new();
        let where_clause = self.key_where(&mut params, true, false);
        Ok(Some(Statement {
            sql: format!(
                "SELECT {} FROM {} WHERE {}",
                self.quote(&version.column_name),
                self.quoted_table(),
                where_clause
            ),
            params,
            generated_key: None,
        }))
    }

    /// `k1 = ? AND k2 = ?[ AND version = ?]`, appending the plan to `params`.
    ///
    /// `from_record` binds keys from the record's fields rather than caller values.
    fn key_where(&self, params: &mut Vec<ParamSource>, from_record: bool, with_version: bool) -> String {
        let mut terms = Vec::new();
        for (pos, (idx, column)) in self.table.key_columns().enumerate() {
            params.push(if from_record {
                ParamSource::Column(idx)
            } else {
                ParamSource::Key(pos)
            });
            terms.push(format!(
                "{} = {}",
                self.quote(&column.column_name),
                self.dialect.placeholder(params.len())
            ));
        }
        if with_version {
            if let Some((_, version)) = self.table.version_column() {
                params.push(ParamSource::OldVersion);
                terms.push(format!(
                    "{} = {}",
                    self.quote(&version.column_name),
                    self.dialect.placeholder(params.len())
                ));
            }
        }
        terms.join(" AND ")
    }

    fn require_keys(&self, operation: &str) -> Result<()> {
        if self.table.key_count() == 0 {
            return Err(Error::Registration(
                RegistrationError::new(
                    RegistrationErrorKind::MissingPrimaryKey,
                    format!("cannot {operation} without a primary key"),
                )
                .table(self.table.qualified_name()),
            ));
        }
        Ok(())
    }
}
