//! Transactions.
//!
//! A [`Transaction`] exposes the same executor contract as [`DbMap`] over one database
//! transaction. It has no `begin`, so transactions cannot nest.

use tablemap_core::{
    Connection, ConnectionError, ConnectionErrorKind, Error, Params, Record, RecordType, Registry,
    Result, Row, SqlExecutor, TransactionOps, Value,
};

use crate::dbmap::DbMap;
use crate::engine::Engine;

/// An open transaction. Dropping it without [`commit`](Self::commit) rolls back.
pub struct Transaction<'a, C: Connection + 'a> {
    map: &'a DbMap<C>,
    tx: Option<C::Tx<'a>>,
}

impl<'a, C: Connection + 'a> Transaction<'a, C> {
    pub(crate) fn new(map: &'a DbMap<C>, tx: C::Tx<'a>) -> Self {
        Self { map, tx: Some(tx) }
    }

    /// Make every operation performed through this transaction visible.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn commit(mut self) -> Result<()> {
        match self.tx.take() {
            Some(tx) => {
                tx.commit()?;
                tracing::debug!("transaction committed");
                Ok(())
            }
            None => Err(finished()),
        }
    }

    /// Discard every operation performed through this transaction.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn rollback(mut self) -> Result<()> {
        match self.tx.take() {
            Some(tx) => {
                tx.rollback()?;
                tracing::debug!("transaction rolled back");
                Ok(())
            }
            None => Err(finished()),
        }
    }

    fn engine(&self) -> Result<Engine<'_>> {
        let tx = self.tx.as_ref().ok_or_else(finished)?;
        Ok(self.map.engine(tx, self))
    }
}

fn finished() -> Error {
    Error::Connection(ConnectionError {
        kind: ConnectionErrorKind::Closed,
        message: "transaction already finished".to_string(),
        source: None,
    })
}

impl<'a, C: Connection + 'a> Drop for Transaction<'a, C> {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            tracing::warn!("transaction dropped without commit or rollback, rolling back");
            if let Err(e) = tx.rollback() {
                tracing::warn!(error = %e, "rollback of dropped transaction failed");
            }
        }
    }
}

impl<'a, C: Connection + 'a> std::fmt::Debug for Transaction<'a, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("dialect", &self.map.dialect().name())
            .field("active", &self.tx.is_some())
            .finish()
    }
}

impl<'a, C: Connection + 'a> SqlExecutor for Transaction<'a, C> {
    fn registry(&self) -> &Registry {
        self.map.registry()
    }

    fn as_executor(&self) -> &dyn SqlExecutor {
        self
    }

    #[tracing::instrument(level = "debug", skip_all, fields(records = records.len()))]
    fn insert(&self, records: &mut [&mut dyn Record]) -> Result<()> {
        self.engine()?.insert(records)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(records = records.len()))]
    fn update(&self, records: &mut [&mut dyn Record]) -> Result<u64> {
        self.engine()?.update(records)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(records = records.len()))]
    fn delete(&self, records: &mut [&mut dyn Record]) -> Result<u64> {
        self.engine()?.delete(records)
    }

    #[tracing::instrument(level = "debug", skip_all)]
    fn get(&self, dest: &mut dyn Record, keys: &[Value]) -> Result<()> {
        self.engine()?.get(dest, keys)
    }

    fn exists(&self, record_type: RecordType, keys: &[Value]) -> Result<bool> {
        self.engine()?.exists(record_type, keys)
    }

    fn exec(&self, sql: &str, params: &Params<'_>) -> Result<u64> {
        self.engine()?.exec(sql, params)
    }

    fn query(&self, sql: &str, params: &Params<'_>) -> Result<Vec<Row>> {
        self.engine()?.query(sql, params)
    }
}


#[cfg(test)]
mod tests {
    use tablemap_core::{Hooks, SqlExecutor, params};
    use tablemap_macros::Record;
    use tablemap_query::SqliteDialect;

    use super::*;
    use crate::SelectExt;
    use crate::mock::MockConnection;

    #[derive(Debug, Default, Record)]
    #[db(hooks)]
    struct Order {
        #[db("id, primarykey, autoincrement")]
        id: i64,
        #[db("total")]
        total: i64,
    }

    impl Hooks for Order {
        fn post_insert(&mut self, exec: &dyn SqlExecutor) -> Result<()> {
            exec.exec(
                "INSERT INTO audit (order_id) VALUES (:id)",
                &params!("id" => self.id),
            )?;
            Ok(())
        }
    }

    fn order_map() -> (DbMap<MockConnection>, MockConnection) {
        let conn = MockConnection::new();
        let mut db = DbMap::new(conn.clone(), SqliteDialect);
        db.add_table::<Order>("orders").unwrap();
        (db, conn)
    }

    #[test]
    fn test_commit_wraps_operations() {
        let (db, conn) = order_map();
        let tx = db.begin().unwrap();
        let mut order = Order {
            total: 10,
            ..Default::default()
        };
        tx.insert(&mut [&mut order]).unwrap();
        tx.commit().unwrap();

        let sql = conn.sql();
        assert_eq!(sql.first().map(String::as_str), Some("BEGIN"));
        assert_eq!(sql.last().map(String::as_str), Some("COMMIT"));
        assert!(sql[1].starts_with(r#"INSERT INTO "orders""#));
    }

    #[test]
    fn test_hooks_receive_the_transaction() {
        let (db, conn) = order_map();
        let tx = db.begin().unwrap();
        tx.insert(&mut [&mut Order::default()]).unwrap();
        tx.rollback().unwrap();

        assert_eq!(
            conn.sql(),
            vec![
                "BEGIN".to_string(),
                r#"INSERT INTO "orders" ("total") VALUES (?)"#.to_string(),
                "INSERT INTO audit (order_id) VALUES (?)".to_string(),
                "ROLLBACK".to_string(),
            ]
        );
    }

    #[test]
    fn test_drop_rolls_back() {
        let (db, conn) = order_map();
        {
            let tx = db.begin().unwrap();
            tx.select_int("SELECT count(*) FROM orders", &params!())
                .unwrap();
        }
        assert_eq!(conn.sql().last().map(String::as_str), Some("ROLLBACK"));
    }

    #[test]
    fn test_debug_shows_state() {
        let (db, _conn) = order_map();
        let tx = db.begin().unwrap();
        let shown = format!("{tx:?}");
        assert!(shown.contains("active: true"));
        assert!(shown.contains("sqlite"));
        tx.commit().unwrap();
    }
}
