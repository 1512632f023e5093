//! SQL generation for tablemap.
//!
//! - [`Dialect`] with SQLite, PostgreSQL and MySQL implementations
//! - [`StatementBuilder`] for the per-table CRUD statements
//! - [`named::expand`] for `:name` parameters in ad hoc SQL

pub mod builder;
pub mod dialect;
pub mod named;

pub use builder::{GeneratedKey, ParamSource, Statement, StatementBuilder};
pub use dialect::{
    Dialect, KeyStrategy, MySqlDialect, PlaceholderStyle, PostgresDialect, SqliteDialect,
};
pub use named::Expanded;
