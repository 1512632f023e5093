//! SQLite driver for tablemap.
//!
//! [`SqliteConnection`] implements [`tablemap_core::Connection`] over a small pool of
//! `rusqlite` connections. File databases run in WAL mode by default so readers never
//! block the single writer; in-memory databases use exactly one connection.
//!
//! ```ignore
//! use tablemap_query::SqliteDialect;
//! use tablemap_session::DbMap;
//! use tablemap_sqlite::{SqliteConfig, SqliteConnection};
//!
//! let conn = SqliteConnection::open(SqliteConfig::file("app.db").max_connections(8))?;
//! let mut db = DbMap::new(conn, SqliteDialect);
//! ```

mod config;
mod connection;
mod convert;
mod pool;

pub use config::{JournalMode, SqliteConfig};
pub use connection::{SqliteConnection, SqliteTransaction};
