//! A scripted connection that records every statement it receives.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use tablemap_core::{
    Connection, Error, QueryError, QueryErrorKind, Queryable, Result, Row, TransactionOps, Value,
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Call {
    pub(crate) sql: String,
    pub(crate) params: Vec<Value>,
}

#[derive(Debug)]
pub(crate) enum Reply {
    Rows(Vec<Row>),
    Affected(u64),
    Fail(&'static str),
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<Call>,
    replies: VecDeque<Reply>,
    next_id: i64,
}

/// Replies are consumed in order; with none queued, queries return no rows, executes
/// affect one row and inserts hand out increasing ids.
#[derive(Debug, Default, Clone)]
pub(crate) struct MockConnection {
    state: Arc<Mutex<State>>,
}

impl MockConnection {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(&self, reply: Reply) {
        self.lock().replies.push_back(reply);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub(crate) fn sql(&self) -> Vec<String> {
        self.lock().calls.iter().map(|c| c.sql.clone()).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn log(&self, sql: &str) {
        self.lock().calls.push(Call {
            sql: sql.to_string(),
            params: Vec::new(),
        });
    }

    fn record(&self, sql: &str, params: &[Value]) -> Option<Reply> {
        let mut state = self.lock();
        state.calls.push(Call {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        state.replies.pop_front()
    }
}

fn failure(message: &str, sql: &str) -> Error {
    Error::Query(QueryError {
        kind: QueryErrorKind::Database,
        message: message.to_string(),
        sql: Some(sql.to_string()),
        source: None,
    })
}

pub(crate) fn rows(columns: &[&str], data: Vec<Vec<Value>>) -> Vec<Row> {
    let columns: Arc<[String]> = columns.iter().map(|c| (*c).to_string()).collect();
    data.into_iter()
        .map(|values| Row::new(Arc::clone(&columns), values))
        .collect()
}

impl Queryable for MockConnection {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        match self.record(sql, params) {
            Some(Reply::Rows(rows)) => Ok(rows),
            Some(Reply::Fail(message)) => Err(failure(message, sql)),
            Some(Reply::Affected(_)) | None => Ok(Vec::new()),
        }
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        match self.record(sql, params) {
            Some(Reply::Affected(n)) => Ok(n),
            Some(Reply::Fail(message)) => Err(failure(message, sql)),
            Some(Reply::Rows(_)) | None => Ok(1),
        }
    }

    fn insert(&self, sql: &str, params: &[Value]) -> Result<i64> {
        match self.record(sql, params) {
            Some(Reply::Fail(message)) => Err(failure(message, sql)),
            _ => {
                let mut state = self.lock();
                state.next_id += 1;
                Ok(state.next_id)
            }
        }
    }
}

pub(crate) struct MockTx<'c> {
    conn: &'c MockConnection,
}

impl Queryable for MockTx<'_> {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.conn.query(sql, params)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        self.conn.execute(sql, params)
    }

    fn insert(&self, sql: &str, params: &[Value]) -> Result<i64> {
        self.conn.insert(sql, params)
    }
}

impl TransactionOps for MockTx<'_> {
    fn commit(self) -> Result<()> {
        self.conn.log("COMMIT");
        Ok(())
    }

    fn rollback(self) -> Result<()> {
        self.conn.log("ROLLBACK");
        Ok(())
    }
}

impl Connection for MockConnection {
    type Tx<'conn> = MockTx<'conn>;

    fn begin(&self) -> Result<MockTx<'_>> {
        self.log("BEGIN");
        Ok(MockTx { conn: self })
    }
}
