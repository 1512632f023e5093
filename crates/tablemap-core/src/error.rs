//! Error types for mapping and execution.
//!
//! Every failure the engine produces is one variant of [`Error`]. Variants wrap a payload
//! struct carrying enough identity (table name, key values, column names) for the caller
//! to act without re-querying. Driver failures arrive as [`Error::Query`] or
//! [`Error::Connection`] with the driver's own error kept as `source`.

use std::fmt;

use crate::value::Value;

/// Result alias used throughout tablemap.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed driver error kept as the `source` of a query or connection error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The error type for all tablemap operations.
#[derive(Debug)]
pub enum Error {
    /// Bad or duplicate metadata, detected while registering or configuring a table.
    Registration(RegistrationError),
    /// Records of different types were passed to one multi-record call.
    TypeMismatch(TypeMismatchError),
    /// A primary-key lookup or single-row select found no rows.
    NotFound(NotFoundError),
    /// A single-row select found more than one row.
    MultipleRows(MultipleRowsError),
    /// Version mismatch or vanished row on update/delete.
    OptimisticLock(OptimisticLockError),
    /// Result columns or parameters could not be bound.
    Bind(BindError),
    /// One record of a multi-record call failed.
    Batch(BatchError),
    /// The database rejected a statement.
    Query(QueryError),
    /// The database could not be reached or the connection was lost.
    Connection(ConnectionError),
    /// Free-form error, typically raised by user hooks.
    Custom(String),
}

impl Error {
    /// Create a custom error with the given message.
    pub fn custom(message: impl Into<String>) -> Self {
        Error::Custom(message.into())
    }

    /// The error that actually caused this one, looking through batch wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Batch(batch) => batch.source.root(),
            other => other,
        }
    }

    /// Whether this is (or wraps) a no-rows condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Error::NotFound(_))
    }

    /// Whether this is (or wraps) an optimistic lock failure.
    pub fn is_optimistic_lock(&self) -> bool {
        matches!(self.root(), Error::OptimisticLock(_))
    }

    /// Whether this is (or wraps) a registration problem.
    pub fn is_registration(&self) -> bool {
        matches!(self.root(), Error::Registration(_))
    }

    /// The registration error kind, if this is one.
    pub fn registration_kind(&self) -> Option<RegistrationErrorKind> {
        match self.root() {
            Error::Registration(e) => Some(e.kind),
            _ => None,
        }
    }

    /// The binding error kind, if this is one.
    pub fn bind_kind(&self) -> Option<BindErrorKind> {
        match self.root() {
            Error::Bind(e) => Some(e.kind),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Registration(e) => write!(f, "{e}"),
            Error::TypeMismatch(e) => write!(f, "{e}"),
            Error::NotFound(e) => write!(f, "{e}"),
            Error::MultipleRows(e) => write!(f, "{e}"),
            Error::OptimisticLock(e) => write!(f, "{e}"),
            Error::Bind(e) => write!(f, "{e}"),
            Error::Batch(e) => write!(f, "{e}"),
            Error::Query(e) => write!(f, "{e}"),
            Error::Connection(e) => write!(f, "{e}"),
            Error::Custom(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Batch(e) => Some(e.source.as_ref()),
            Error::Query(e) => e
                .source
                .as_ref()
                .map(|s| s.as_ref() as &(dyn std::error::Error + 'static)),
            Error::Connection(e) => e
                .source
                .as_ref()
                .map(|s| s.as_ref() as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

fn fmt_keys(keys: &[Value]) -> String {
    let parts: Vec<String> = keys.iter().map(ToString::to_string).collect();
    format!("[{}]", parts.join(", "))
}

// ============================================================================
// Registration
// ============================================================================

/// What went wrong while registering or configuring a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationErrorKind {
    /// The table name was empty.
    MissingTableName,
    /// Another table with the same qualified name is already registered.
    DuplicateTable,
    /// Two fields resolve to the same column name.
    DuplicateColumn,
    /// Two indexes on one table share a name.
    DuplicateIndex,
    /// More than one column is flagged as the version column.
    MultipleVersionColumns,
    /// Auto-increment on a non-integer, non-key or composite-key column.
    InvalidAutoIncrement,
    /// The version column is not an integer column.
    InvalidVersionColumn,
    /// A field tag could not be parsed.
    InvalidTag,
    /// A builder method named a field the table does not map.
    UnknownField,
    /// The record type was never registered.
    NotRegistered,
    /// A bare table name matches tables in more than one schema.
    AmbiguousTable,
    /// The operation needs a primary key and the table has none.
    MissingPrimaryKey,
    /// The table was mutated after it was first used.
    Frozen,
}

/// Bad or duplicate metadata.
#[derive(Debug, Clone)]
pub struct RegistrationError {
    pub kind: RegistrationErrorKind,
    /// Table involved, when known.
    pub table: Option<String>,
    pub message: String,
}

impl RegistrationError {
    pub fn new(kind: RegistrationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            table: None,
            message: message.into(),
        }
    }

    /// Attach the table name.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "registration error on table {table}: {}", self.message),
            None => write!(f, "registration error: {}", self.message),
        }
    }
}

impl From<RegistrationError> for Error {
    fn from(e: RegistrationError) -> Self {
        Error::Registration(e)
    }
}

// ============================================================================
// Type mismatch
// ============================================================================

/// Records of different types were mixed in one call.
#[derive(Debug, Clone)]
pub struct TypeMismatchError {
    /// Type of the first record in the call.
    pub expected: &'static str,
    /// Type of the offending record.
    pub found: &'static str,
    /// Position of the offending record.
    pub position: usize,
}

impl fmt::Display for TypeMismatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "record {} has type {}, expected {} like the first record",
            self.position, self.found, self.expected
        )
    }
}

// ============================================================================
// Row count errors
// ============================================================================

/// No rows matched a lookup that needs exactly one.
#[derive(Debug, Clone, Default)]
pub struct NotFoundError {
    pub table: Option<String>,
    /// Primary-key values used for the lookup (empty for ad hoc selects).
    pub keys: Vec<Value>,
    pub sql: Option<String>,
}

impl fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "no rows in {table} for key {}", fmt_keys(&self.keys)),
            None => write!(f, "no rows in result set"),
        }
    }
}

/// More rows matched than the caller can accept.
#[derive(Debug, Clone, Default)]
pub struct MultipleRowsError {
    pub table: Option<String>,
    pub keys: Vec<Value>,
    /// How many rows came back.
    pub count: usize,
}

impl fmt::Display for MultipleRowsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(
                f,
                "expected one row in {table} for key {}, found {}",
                fmt_keys(&self.keys),
                self.count
            ),
            None => write!(f, "expected one row, found {}", self.count),
        }
    }
}

// ============================================================================
// Optimistic locking
// ============================================================================

/// An update or delete matched no row because the version moved on or the row is gone.
#[derive(Debug, Clone)]
pub struct OptimisticLockError {
    pub table: String,
    pub keys: Vec<Value>,
    /// Version held by the in-memory record.
    pub local_version: i64,
    /// Whether a row with these keys still exists.
    pub row_exists: bool,
    /// The version currently stored, when the row exists.
    pub remote_version: Option<i64>,
}

impl fmt::Display for OptimisticLockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.row_exists {
            write!(
                f,
                "optimistic lock failed on {} key {}: local version {}, stored version {}",
                self.table,
                fmt_keys(&self.keys),
                self.local_version,
                self.remote_version
                    .map_or_else(|| "unknown".to_string(), |v| v.to_string())
            )
        } else {
            write!(
                f,
                "optimistic lock failed on {} key {}: row no longer exists (local version {})",
                self.table,
                fmt_keys(&self.keys),
                self.local_version
            )
        }
    }
}

// ============================================================================
// Binding
// ============================================================================

/// What went wrong while binding values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindErrorKind {
    /// A result column has no destination field.
    UnmatchedColumn,
    /// Two result columns map to the same destination field.
    DuplicateColumn,
    /// A scalar destination received more or fewer than one column.
    ColumnCount,
    /// A value could not be converted to the field's type.
    Conversion,
    /// A named parameter has no value.
    MissingParameter,
    /// Wrong number of key values.
    ParameterCount,
    /// A record accessor was asked for a field it does not have.
    UnknownField,
}

/// Values could not be bound to a destination or a statement.
#[derive(Debug, Clone)]
pub struct BindError {
    pub kind: BindErrorKind,
    pub message: String,
    /// Column or parameter involved, when known.
    pub column: Option<String>,
}

impl BindError {
    pub fn new(kind: BindErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            column: None,
        }
    }

    /// Attach the column or parameter name.
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.column {
            Some(col) => write!(f, "bind error on {col}: {}", self.message),
            None => write!(f, "bind error: {}", self.message),
        }
    }
}

impl From<BindError> for Error {
    fn from(e: BindError) -> Self {
        Error::Bind(e)
    }
}

// ============================================================================
// Batch
// ============================================================================

/// One record of a multi-record call failed; earlier records were not rolled back.
#[derive(Debug)]
pub struct BatchError {
    /// Zero-based position of the failing record.
    pub position: usize,
    /// Number of records in the call.
    pub total: usize,
    pub table: String,
    pub source: Box<Error>,
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "record {} of {} on {} failed: {}",
            self.position, self.total, self.table, self.source
        )
    }
}

// ============================================================================
// Driver errors
// ============================================================================

/// Classification of statement failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Malformed SQL or unknown table/column.
    Syntax,
    /// Constraint violation (unique, not null, foreign key, check).
    Constraint,
    /// The database is locked or busy.
    Busy,
    /// Any other database-side failure.
    Database,
}

/// The database rejected a statement.
#[derive(Debug)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub message: String,
    /// Statement that failed, when known.
    pub sql: Option<String>,
    /// The driver's own error.
    pub source: Option<BoxError>,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sql {
            Some(sql) => write!(f, "query error: {} (sql: {sql})", self.message),
            None => write!(f, "query error: {}", self.message),
        }
    }
}

/// Classification of connection failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// Opening the database failed.
    Open,
    /// No connection could be checked out.
    Pool,
    /// The connection is closed or poisoned.
    Closed,
}

/// The database could not be reached.
#[derive(Debug)]
pub struct ConnectionError {
    pub kind: ConnectionErrorKind,
    pub message: String,
    pub source: Option<BoxError>,
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "connection error: {}", self.message)
    }
}
