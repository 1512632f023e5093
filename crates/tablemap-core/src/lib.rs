//! Core types for tablemap.
//!
//! `tablemap-core` holds everything the other crates share:
//!
//! - [`Value`] and [`Row`] for data crossing the driver boundary
//! - [`Record`], [`FieldDef`] and [`Hooks`], the capability a mapped type provides
//! - [`Registry`], [`TableMap`] and [`ColumnMap`], the metadata derived from record types
//! - [`Bindable`], converting result sets into records or scalars
//! - [`Connection`] and [`TransactionOps`], implemented by drivers
//! - [`SqlExecutor`], implemented by the map and its transactions
//! - [`Error`] and its payloads

pub mod bind;
pub mod connection;
pub mod error;
pub mod executor;
pub mod params;
pub mod record;
pub mod registry;
pub mod row;
pub mod table;
pub mod tag;
pub mod types;
pub mod value;

pub use bind::{Bindable, bind_into};
pub use connection::{Connection, Queryable, TransactionOps};
pub use error::{
    BatchError, BindError, BindErrorKind, BoxError, ConnectionError, ConnectionErrorKind, Error,
    MultipleRowsError, NotFoundError, OptimisticLockError, QueryError, QueryErrorKind,
    RegistrationError, RegistrationErrorKind, Result, TypeMismatchError,
};
pub use executor::SqlExecutor;
pub use params::Params;
pub use record::{FieldDef, Hooks, Record, RecordType, unknown_field};
pub use registry::{Registry, Shape};
pub use row::Row;
pub use table::{ColumnMap, IndexMap, TableMap};
pub use tag::FieldTag;
pub use types::{FieldType, SqlType};
pub use value::{FromValue, ToValue, Value};
