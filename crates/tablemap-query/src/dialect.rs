//! SQL dialects.
//!
//! A [`Dialect`] is the only place engine differences live: quoting, placeholders, type
//! names, auto-increment syntax, statement suffixes and how generated keys come back. The
//! statement builder and the executor only ever talk to `&dyn Dialect`.

use std::fmt;

use serde::{Deserialize, Serialize};
use tablemap_core::SqlType;

/// How bind parameters are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?` for every parameter.
    Positional,
    /// `$1`, `$2`, ...
    Numbered,
}

/// How an auto-increment key is read back after INSERT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrategy {
    /// Ask the driver for the last inserted id.
    LastInsertId,
    /// Append `RETURNING <key>` and read the returned row.
    Returning,
}

/// Per-engine SQL syntax.
pub trait Dialect: fmt::Debug + Send + Sync {
    /// Short engine name, used in logs.
    fn name(&self) -> &'static str;

    /// Quote an identifier, escaping embedded quote characters.
    fn quote_identifier(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    /// Quote a possibly schema-qualified table name.
    fn quote_table(&self, schema: Option<&str>, table: &str) -> String {
        match schema {
            Some(schema) => format!(
                "{}.{}",
                self.quote_identifier(schema),
                self.quote_identifier(table)
            ),
            None => self.quote_identifier(table),
        }
    }

    /// Placeholder for the 1-based parameter `ordinal`.
    fn placeholder(&self, ordinal: usize) -> String;

    fn placeholder_style(&self) -> PlaceholderStyle;

    /// Column type for DDL.
    fn type_name(&self, sql_type: SqlType, max_size: Option<u32>, auto_increment: bool) -> String;

    /// Text appended to an auto-increment column definition. May be empty.
    fn auto_increment_clause(&self) -> &'static str;

    /// Text appended after the closing parenthesis of CREATE TABLE.
    fn create_table_suffix(&self) -> String {
        String::new()
    }

    /// Text appended after CREATE INDEX.
    fn create_index_suffix(&self) -> String {
        String::new()
    }

    fn key_strategy(&self) -> KeyStrategy {
        KeyStrategy::LastInsertId
    }

    /// Whether `CREATE SCHEMA` is available.
    fn supports_schemas(&self) -> bool {
        true
    }

    /// Statement emptying a table.
    fn truncate_statement(&self, quoted_table: &str) -> String {
        format!("TRUNCATE TABLE {quoted_table}")
    }
}

fn sized_text(max_size: Option<u32>) -> String {
    match max_size {
        Some(n) => format!("varchar({n})"),
        None => "text".to_string(),
    }
}

// ============================================================================
// SQLite
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn placeholder(&self, _ordinal: usize) -> String {
        "?".to_string()
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Positional
    }

    fn type_name(&self, sql_type: SqlType, max_size: Option<u32>, _auto_increment: bool) -> String {
        match sql_type {
            SqlType::Integer | SqlType::BigInt | SqlType::Boolean => "integer".to_string(),
            SqlType::Double => "real".to_string(),
            SqlType::Text => sized_text(max_size),
            SqlType::Blob => "blob".to_string(),
            SqlType::Json => "text".to_string(),
        }
    }

    fn auto_increment_clause(&self) -> &'static str {
        "autoincrement"
    }

    fn supports_schemas(&self) -> bool {
        false
    }

    fn truncate_statement(&self, quoted_table: &str) -> String {
        format!("DELETE FROM {quoted_table}")
    }
}

// ============================================================================
// PostgreSQL
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn placeholder(&self, ordinal: usize) -> String {
        format!("${ordinal}")
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Numbered
    }

    fn type_name(&self, sql_type: SqlType, max_size: Option<u32>, auto_increment: bool) -> String {
        match (sql_type, auto_increment) {
            (SqlType::Integer, true) => "serial".to_string(),
            (SqlType::BigInt, true) => "bigserial".to_string(),
            (SqlType::Integer, false) => "integer".to_string(),
            (SqlType::BigInt, false) => "bigint".to_string(),
            (SqlType::Boolean, _) => "boolean".to_string(),
            (SqlType::Double, _) => "double precision".to_string(),
            (SqlType::Text, _) => sized_text(max_size),
            (SqlType::Blob, _) => "bytea".to_string(),
            (SqlType::Json, _) => "jsonb".to_string(),
        }
    }

    // serial types carry the sequence themselves
    fn auto_increment_clause(&self) -> &'static str {
        ""
    }

    fn key_strategy(&self) -> KeyStrategy {
        KeyStrategy::Returning
    }

    fn truncate_statement(&self, quoted_table: &str) -> String {
        format!("TRUNCATE {quoted_table} RESTART IDENTITY")
    }
}

// ============================================================================
// MySQL
// ============================================================================

/// MySQL dialect. Engine and encoding end up in every CREATE TABLE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MySqlDialect {
    /// Storage engine, e.g. `InnoDB`.
    pub engine: String,
    /// Default character set, e.g. `utf8mb4`.
    pub encoding: String,
}

impl Default for MySqlDialect {
    fn default() -> Self {
        Self {
            engine: "InnoDB".to_string(),
            encoding: "utf8mb4".to_string(),
        }
    }
}

impl MySqlDialect {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the storage engine.
    pub fn engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = engine.into();
        self
    }

    /// Set the default character set.
    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }
}

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    fn placeholder(&self, _ordinal: usize) -> String {
        "?".to_string()
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Positional
    }

    fn type_name(&self, sql_type: SqlType, max_size: Option<u32>, _auto_increment: bool) -> String {
        match sql_type {
            SqlType::Integer => "int".to_string(),
            SqlType::BigInt => "bigint".to_string(),
            SqlType::Boolean => "boolean".to_string(),
            SqlType::Double => "double".to_string(),
            // varchar needs a length in MySQL
            SqlType::Text => format!("varchar({})", max_size.unwrap_or(255)),
            SqlType::Blob => "mediumblob".to_string(),
            SqlType::Json => "json".to_string(),
        }
    }

    fn auto_increment_clause(&self) -> &'static str {
        "auto_increment"
    }

    fn create_table_suffix(&self) -> String {
        format!(" engine={} charset={}", self.engine, self.encoding)
    }
}
