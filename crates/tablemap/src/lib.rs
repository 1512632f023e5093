//! Map Rust records to SQL tables.
//!
//! tablemap is a thin mapping layer, not a full ORM: register a record type against a
//! table, then insert, update, delete and get it by primary key, or run SQL of your own and
//! bind the results strictly into records or scalars. Lifecycle hooks run around each
//! statement, and a version column turns on optimistic locking.
//!
//! # Example
//!
//! ```ignore
//! use tablemap::prelude::*;
//!
//! #[derive(Debug, Default, Record)]
//! struct Invoice {
//!     #[db("Id, primarykey, autoincrement")]
//!     id: i64,
//!     #[db("Memo, size:200")]
//!     memo: String,
//!     #[db("Version, version")]
//!     version: i64,
//! }
//!
//! let mut db = DbMap::new(SqliteConnection::open_memory()?, SqliteDialect);
//! db.add_table::<Invoice>("invoice")?;
//! db.create_tables_if_not_exists()?;
//!
//! let mut inv = Invoice { memo: "first".into(), ..Default::default() };
//! db.insert(&mut [&mut inv])?;
//!
//! let memos: Vec<String> = db.select("SELECT Memo FROM invoice", &params![])?;
//! ```
//!
//! The derive generates code against `tablemap_core`, so crates using `#[derive(Record)]`
//! depend on `tablemap-core` next to `tablemap`.
//!
//! # Crates
//!
//! | Crate | Contents |
//! |-------|----------|
//! | `tablemap-core` | values, rows, errors, `Record`, registry and table metadata |
//! | `tablemap-macros` | `#[derive(Record)]` |
//! | `tablemap-query` | dialects, statement builder, named parameters |
//! | `tablemap-schema` | DDL generation |
//! | `tablemap-session` | `DbMap`, `Transaction`, typed selects |
//! | `tablemap-sqlite` | rusqlite driver (feature `sqlite`, on by default) |

pub use tablemap_core::{
    BatchError, BindError, BindErrorKind, Bindable, ColumnMap, Connection, ConnectionError,
    ConnectionErrorKind, Error, FieldDef, FieldTag, FieldType, FromValue, Hooks, IndexMap,
    MultipleRowsError, NotFoundError, OptimisticLockError, Params, QueryError, QueryErrorKind,
    Queryable, Record, RecordType, Registry, RegistrationError, RegistrationErrorKind, Result,
    Row, SqlExecutor, SqlType, TableMap, ToValue, TransactionOps, TypeMismatchError, Value,
    params,
};
pub use tablemap_macros::Record;
pub use tablemap_query::{
    Dialect, KeyStrategy, MySqlDialect, PlaceholderStyle, PostgresDialect, SqliteDialect,
};
pub use tablemap_session::{DbMap, DbMapConfig, SelectExt, Transaction};
#[cfg(feature = "sqlite")]
pub use tablemap_sqlite::{JournalMode, SqliteConfig, SqliteConnection};

pub use tablemap_query as query;
pub use tablemap_schema as schema;

/// Everything needed to define records and run operations.
pub mod prelude {
    pub use tablemap_core::{
        Error, Hooks, Params, Record, RecordType, Result, Row, SqlExecutor, Value, params,
    };
    pub use tablemap_macros::Record;
    pub use tablemap_query::{MySqlDialect, PostgresDialect, SqliteDialect};
    pub use tablemap_session::{DbMap, DbMapConfig, SelectExt, Transaction};
    #[cfg(feature = "sqlite")]
    pub use tablemap_sqlite::{SqliteConfig, SqliteConnection};
}
