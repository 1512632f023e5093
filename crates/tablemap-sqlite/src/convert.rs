//! Value and error conversion between tablemap and rusqlite.

use rusqlite::ErrorCode;
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqliteValue, ValueRef};
use tablemap_core::{
    ConnectionError, ConnectionErrorKind, Error, QueryError, QueryErrorKind, Value,
};

/// Borrowed bind parameter.
pub(crate) struct SqlParam<'a>(pub(crate) &'a Value);

impl ToSql for SqlParam<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self.0 {
            Value::Null => ToSqlOutput::Owned(SqliteValue::Null),
            Value::Bool(b) => ToSqlOutput::Owned(SqliteValue::Integer(i64::from(*b))),
            Value::Int(v) => ToSqlOutput::Owned(SqliteValue::Integer(i64::from(*v))),
            Value::BigInt(v) => ToSqlOutput::Owned(SqliteValue::Integer(*v)),
            Value::Double(v) => ToSqlOutput::Owned(SqliteValue::Real(*v)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Bytes(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
            // SQLite stores JSON as text.
            Value::Json(j) => ToSqlOutput::Owned(SqliteValue::Text(j.to_string())),
        })
    }
}

/// SQLite has five storage classes; integers always come back as `BigInt`.
///
/// TEXT cells that are not valid UTF-8 come back as `Bytes` untouched.
pub(crate) fn from_value_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::BigInt(i),
        ValueRef::Real(f) => Value::Double(f),
        ValueRef::Text(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => Value::Text(text.to_string()),
            Err(_) => Value::Bytes(bytes.to_vec()),
        },
        ValueRef::Blob(bytes) => Value::Bytes(bytes.to_vec()),
    }
}

pub(crate) fn query_error(err: rusqlite::Error, sql: &str) -> Error {
    let kind = match err.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => QueryErrorKind::Constraint,
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => QueryErrorKind::Busy,
        _ if err.to_string().contains("syntax error") => QueryErrorKind::Syntax,
        _ => QueryErrorKind::Database,
    };
    Error::Query(QueryError {
        kind,
        message: err.to_string(),
        sql: Some(sql.to_string()),
        source: Some(Box::new(err)),
    })
}

pub(crate) fn connection_error(
    kind: ConnectionErrorKind,
    message: impl Into<String>,
    err: rusqlite::Error,
) -> Error {
    Error::Connection(ConnectionError {
        kind,
        message: format!("{}: {err}", message.into()),
        source: Some(Box::new(err)),
    })
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use super::*;

    #[test]
    fn test_values_round_trip_through_sqlite() {
        let conn = Connection::open_in_memory().unwrap();
        let params = [
            Value::Null,
            Value::Bool(true),
            Value::Int(7),
            Value::Double(1.5),
            Value::Text("memo".into()),
            Value::Bytes(vec![1, 2]),
            Value::Json(serde_json::json!({"a": 1})),
        ];
        let back: Vec<Value> = conn
            .query_row(
                "SELECT ?, ?, ?, ?, ?, ?, ?",
                rusqlite::params_from_iter(params.iter().map(SqlParam)),
                |row| (0..params.len()).map(|i| row.get_ref(i).map(from_value_ref)).collect(),
            )
            .unwrap();

        assert_eq!(
            back,
            vec![
                Value::Null,
                Value::BigInt(1),
                Value::BigInt(7),
                Value::Double(1.5),
                Value::Text("memo".into()),
                Value::Bytes(vec![1, 2]),
                Value::Text(r#"{"a":1}"#.into()),
            ]
        );
    }

    #[test]
    fn test_invalid_utf8_text_keeps_bytes() {
        let conn = Connection::open_in_memory().unwrap();
        let back = conn
            .query_row("SELECT CAST(x'66ff6f' AS TEXT), typeof(CAST(x'66ff6f' AS TEXT))", [], |row| {
                Ok((row.get_ref(0).map(from_value_ref)?, row.get::<_, String>(1)?))
            })
            .unwrap();
        assert_eq!(back.1, "text");
        assert_eq!(back.0, Value::Bytes(vec![0x66, 0xff, 0x6f]));
    }

    #[test]
    fn test_error_classification() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY)")
            .unwrap();
        conn.execute("INSERT INTO t (id) VALUES (1)", []).unwrap();

        let dup = conn.execute("INSERT INTO t (id) VALUES (1)", []).unwrap_err();
        let Error::Query(e) = query_error(dup, "INSERT") else {
            panic!("expected query error");
        };
        assert_eq!(e.kind, QueryErrorKind::Constraint);
        assert!(e.source.is_some());

        let syntax = conn.execute("SELEC 1", []).unwrap_err();
        let Error::Query(e) = query_error(syntax, "SELEC 1") else {
            panic!("expected query error");
        };
        assert_eq!(e.kind, QueryErrorKind::Syntax);
    }
}
