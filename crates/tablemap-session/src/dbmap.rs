//! The top-level map: registry, dialect and connection in one value.

use tablemap_core::{
    Connection, Params, Record, RecordType, Registry, Result, Row, SqlExecutor, TableMap, Value,
};
use tablemap_query::Dialect;

use crate::config::DbMapConfig;
use crate::engine::Engine;
use crate::plan::PlanCache;
use crate::transaction::Transaction;

/// Maps registered record types onto tables of one database.
///
/// Register tables with [`add_table`](Self::add_table), adjust them through the returned
/// [`TableMap`], then use the [`SqlExecutor`] methods and
/// [`SelectExt`](crate::SelectExt) helpers. Table metadata freezes on first use.
///
/// ```ignore
/// let mut db = DbMap::new(SqliteConnection::open_memory()?, SqliteDialect);
/// db.add_table::<Invoice>("invoice")?.set_keys(true, &["id"])?;
/// db.create_tables_if_not_exists()?;
///
/// let mut inv = Invoice { memo: "first".into(), ..Default::default() };
/// db.insert(&mut [&mut inv])?;
/// ```
#[derive(Debug)]
pub struct DbMap<C: Connection> {
    conn: C,
    dialect: Box<dyn Dialect>,
    registry: Registry,
    config: DbMapConfig,
    plans: PlanCache,
}

impl<C: Connection> DbMap<C> {
    /// Create a map over `conn` speaking `dialect`.
    pub fn new(conn: C, dialect: impl Dialect + 'static) -> Self {
        Self::with_config(conn, dialect, DbMapConfig::default())
    }

    pub fn with_config(conn: C, dialect: impl Dialect + 'static, config: DbMapConfig) -> Self {
        tracing::debug!(dialect = dialect.name(), "creating DbMap");
        Self {
            conn,
            dialect: Box::new(dialect),
            registry: Registry::new(),
            config,
            plans: PlanCache::default(),
        }
    }

    /// Register `T` as table `name`.
    pub fn add_table<T: Record>(&mut self, name: &str) -> Result<&mut TableMap> {
        self.registry.register::<T>(name)
    }

    /// Register `T` as table `schema.name`.
    pub fn add_table_with_schema<T: Record>(
        &mut self,
        schema: &str,
        name: &str,
    ) -> Result<&mut TableMap> {
        self.registry.register_with_schema::<T>(schema, name)
    }

    /// The first table registered for `T`, for further setup.
    pub fn table_mut<T: Record>(&mut self) -> Option<&mut TableMap> {
        self.registry.table_mut::<T>()
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    pub fn config(&self) -> &DbMapConfig {
        &self.config
    }

    /// The underlying connection.
    pub fn connection(&self) -> &C {
        &self.conn
    }

    /// Start a transaction. Operations through it are invisible to others until commit.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn begin(&self) -> Result<Transaction<'_, C>> {
        tracing::debug!("beginning transaction");
        let tx = self.conn.begin()?;
        Ok(Transaction::new(self, tx))
    }

    // ========================================================================
    // Schema
    // ========================================================================

    /// CREATE TABLE for every registered table.
    pub fn create_tables(&self) -> Result<()> {
        self.create_all(false)
    }

    /// CREATE TABLE IF NOT EXISTS for every registered table.
    pub fn create_tables_if_not_exists(&self) -> Result<()> {
        self.create_all(true)
    }

    /// DROP TABLE for every registered table, in reverse registration order.
    pub fn drop_tables(&self) -> Result<()> {
        self.drop_all(false)
    }

    /// DROP TABLE IF EXISTS for every registered table, in reverse registration order.
    pub fn drop_tables_if_exists(&self) -> Result<()> {
        self.drop_all(true)
    }

    /// Remove all rows from every registered table.
    pub fn truncate_tables(&self) -> Result<()> {
        for table in self.registry.tables().iter().rev() {
            table.freeze();
            self.run_ddl(&tablemap_schema::truncate_table(table, self.dialect()))?;
        }
        Ok(())
    }

    /// CREATE INDEX for every named index of every registered table.
    pub fn create_indexes(&self) -> Result<()> {
        for table in self.registry.tables() {
            table.freeze();
            for sql in tablemap_schema::create_indexes(table, self.dialect()) {
                self.run_ddl(&sql)?;
            }
        }
        Ok(())
    }

    fn create_all(&self, if_not_exists: bool) -> Result<()> {
        for table in self.registry.tables() {
            table.freeze();
            for sql in tablemap_schema::create_table(table, self.dialect(), if_not_exists) {
                self.run_ddl(&sql)?;
            }
            tracing::info!(table = %table.qualified_name(), "created table");
        }
        Ok(())
    }

    fn drop_all(&self, if_exists: bool) -> Result<()> {
        for table in self.registry.tables().iter().rev() {
            table.freeze();
            self.run_ddl(&tablemap_schema::drop_table(table, self.dialect(), if_exists))?;
        }
        Ok(())
    }

    fn run_ddl(&self, sql: &str) -> Result<()> {
        tracing::debug!(sql, "executing DDL");
        self.conn.execute(sql, &[])?;
        Ok(())
    }

    // ========================================================================
    // Engine access
    // ========================================================================

    pub(crate) fn engine<'e>(
        &'e self,
        conn: &'e dyn tablemap_core::Queryable,
        exec: &'e dyn SqlExecutor,
    ) -> Engine<'e> {
        Engine {
            registry: &self.registry,
            dialect: self.dialect.as_ref(),
            conn,
            config: &self.config,
            plans: &self.plans,
            exec,
        }
    }

    fn own_engine(&self) -> Engine<'_> {
        self.engine(&self.conn, self)
    }
}

impl<C: Connection> SqlExecutor for DbMap<C> {
    fn registry(&self) -> &Registry {
        &self.registry
    }

    fn as_executor(&self) -> &dyn SqlExecutor {
        self
    }

    #[tracing::instrument(level = "debug", skip_all, fields(records = records.len()))]
    fn insert(&self, records: &mut [&mut dyn Record]) -> Result<()> {
        self.own_engine().insert(records)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(records = records.len()))]
    fn update(&self, records: &mut [&mut dyn Record]) -> Result<u64> {
        self.own_engine().update(records)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(records = records.len()))]
    fn delete(&self, records: &mut [&mut dyn Record]) -> Result<u64> {
        self.own_engine().delete(records)
    }

    #[tracing::instrument(level = "debug", skip_all)]
    fn get(&self, dest: &mut dyn Record, keys: &[Value]) -> Result<()> {
        self.own_engine().get(dest, keys)
    }

    fn exists(&self, record_type: RecordType, keys: &[Value]) -> Result<bool> {
        self.own_engine().exists(record_type, keys)
    }

    fn exec(&self, sql: &str, params: &Params<'_>) -> Result<u64> {
        self.own_engine().exec(sql, params)
    }

    fn query(&self, sql: &str, params: &Params<'_>) -> Result<Vec<Row>> {
        self.own_engine().query(sql, params)
    }
}

#[cfg(test)]
mod tests {
    use tablemap_core::{
        BindErrorKind, Error, Hooks, Params, RecordType, Result, SqlExecutor, Value, params,
    };
    use tablemap_macros::Record;
    use tablemap_query::{PostgresDialect, SqliteDialect};

    use super::*;
    use crate::SelectExt;
    use crate::mock::{MockConnection, Reply, rows};

    #[derive(Debug, Default, Record)]
    struct Invoice {
        #[db("Id, primarykey, autoincrement")]
        id: i64,
        #[db("memo")]
        memo: String,
        #[db("version, version")]
        version: i64,
    }

    #[derive(Debug, Default, Record)]
    struct Note {
        #[db("id, primarykey")]
        id: i64,
        #[db("body")]
        body: String,
    }

    #[derive(Debug, Default, Record)]
    #[db(hooks)]
    struct Tracked {
        #[db("id, primarykey")]
        id: i64,
        #[db("ver, version")]
        ver: i64,
        #[db("-")]
        events: Vec<String>,
    }

    impl Hooks for Tracked {
        fn pre_insert(&mut self, _exec: &dyn SqlExecutor) -> Result<()> {
            self.events.push(format!("pre_insert v{}", self.ver));
            Ok(())
        }

        fn post_insert(&mut self, _exec: &dyn SqlExecutor) -> Result<()> {
            self.events.push(format!("post_insert v{}", self.ver));
            Ok(())
        }

        fn pre_update(&mut self, _exec: &dyn SqlExecutor) -> Result<()> {
            self.events.push(format!("pre_update v{}", self.ver));
            Ok(())
        }

        fn post_update(&mut self, _exec: &dyn SqlExecutor) -> Result<()> {
            self.events.push(format!("post_update v{}", self.ver));
            Ok(())
        }

        fn pre_delete(&mut self, exec: &dyn SqlExecutor) -> Result<()> {
            exec.exec(
                "DELETE FROM child WHERE parent = :id",
                &params!("id" => self.id),
            )?;
            self.events.push("pre_delete".to_string());
            Ok(())
        }

        fn post_get(&mut self, _exec: &dyn SqlExecutor) -> Result<()> {
            self.events.push("post_get".to_string());
            Ok(())
        }
    }

    fn invoice_map() -> (DbMap<MockConnection>, MockConnection) {
        let conn = MockConnection::new();
        let mut db = DbMap::new(conn.clone(), SqliteDialect);
        db.add_table::<Invoice>("invoice").unwrap();
        db.add_table::<Note>("note").unwrap();
        db.add_table::<Tracked>("tracked").unwrap();
        (db, conn)
    }

    #[test]
    fn test_insert_writes_back_key_and_version() {
        let (db, conn) = invoice_map();
        let mut inv = Invoice {
            memo: "first".into(),
            ..Default::default()
        };
        db.insert(&mut [&mut inv]).unwrap();

        assert_eq!(inv.id, 1);
        assert_eq!(inv.version, 1);
        let calls = conn.calls();
        assert_eq!(
            calls[0].sql,
            r#"INSERT INTO "invoice" ("memo", "version") VALUES (?, ?)"#
        );
        assert_eq!(
            calls[0].params,
            vec![Value::Text("first".into()), Value::BigInt(1)]
        );
    }

    #[test]
    fn test_insert_returning_key() {
        let conn = MockConnection::new();
        let mut db = DbMap::new(conn.clone(), PostgresDialect);
        db.add_table::<Invoice>("invoice").unwrap();
        conn.reply(Reply::Rows(rows(&["Id"], vec![vec![Value::BigInt(7)]])));

        let mut inv = Invoice::default();
        db.insert(&mut [&mut inv]).unwrap();

        assert_eq!(inv.id, 7);
        assert!(conn.sql()[0].ends_with(r#"RETURNING "Id""#));
    }

    #[test]
    fn test_insert_returning_without_row_names_table() {
        let conn = MockConnection::new();
        let mut db = DbMap::new(conn.clone(), PostgresDialect);
        db.add_table::<Invoice>("invoice").unwrap();
        conn.reply(Reply::Rows(rows(&["Id"], Vec::new())));

        let mut inv = Invoice::default();
        let err = db.insert(&mut [&mut inv]).unwrap_err();

        let Error::Query(query) = err else {
            panic!("expected query error");
        };
        assert!(query.message.contains("invoice"));
        assert!(query.sql.unwrap().starts_with(r#"INSERT INTO "invoice""#));
        assert_eq!(inv.id, 0);
    }

    #[test]
    fn test_update_bumps_version() {
        let (db, conn) = invoice_map();
        let mut inv = Invoice {
            id: 1,
            memo: "changed".into(),
            version: 1,
        };
        let changed = db.update(&mut [&mut inv]).unwrap();

        assert_eq!(changed, 1);
        assert_eq!(inv.version, 2);
        let calls = conn.calls();
        assert_eq!(
            calls[0].sql,
            r#"UPDATE "invoice" SET "memo" = ?, "version" = ? WHERE "Id" = ? AND "version" = ?"#
        );
        assert_eq!(
            calls[0].params,
            vec![
                Value::Text("changed".into()),
                Value::BigInt(2),
                Value::BigInt(1),
                Value::BigInt(1),
            ]
        );
    }

    #[test]
    fn test_stale_update_reports_lock_failure() {
        let (db, conn) = invoice_map();
        conn.reply(Reply::Affected(0));
        conn.reply(Reply::Rows(rows(&["version"], vec![vec![Value::BigInt(3)]])));

        let mut inv = Invoice {
            id: 1,
            memo: "stale".into(),
            version: 1,
        };
        let err = db.update(&mut [&mut inv]).unwrap_err();

        assert!(err.is_optimistic_lock());
        let Error::OptimisticLock(lock) = err else {
            panic!("expected lock error");
        };
        assert_eq!(lock.table, "invoice");
        assert_eq!(lock.keys, vec![Value::BigInt(1)]);
        assert_eq!(lock.local_version, 1);
        assert!(lock.row_exists);
        assert_eq!(lock.remote_version, Some(3));
        assert_eq!(inv.version, 1);
    }

    #[test]
    fn test_delete_of_missing_versioned_row() {
        let (db, conn) = invoice_map();
        conn.reply(Reply::Affected(0));

        let mut inv = Invoice {
            id: 9,
            memo: String::new(),
            version: 2,
        };
        let Error::OptimisticLock(lock) = db.delete(&mut [&mut inv]).unwrap_err() else {
            panic!("expected lock error");
        };
        assert!(!lock.row_exists);
        assert_eq!(lock.remote_version, None);
    }

    #[test]
    fn test_lock_error_survives_failed_version_lookup() {
        let (db, conn) = invoice_map();
        conn.reply(Reply::Affected(0));
        conn.reply(Reply::Fail("disk I/O error"));

        let mut inv = Invoice {
            id: 4,
            memo: "stale".into(),
            version: 1,
        };
        let err = db.update(&mut [&mut inv]).unwrap_err();

        let Error::OptimisticLock(lock) = err else {
            panic!("expected lock error");
        };
        assert_eq!(lock.keys, vec![Value::BigInt(4)]);
        assert!(!lock.row_exists);
        assert_eq!(lock.remote_version, None);
        assert_eq!(conn.calls().len(), 2);
    }

    #[test]
    fn test_batch_failure_reports_position() {
        let (db, conn) = invoice_map();
        conn.reply(Reply::Affected(1));
        conn.reply(Reply::Fail("constraint failed"));

        let mut a = Note::default();
        let mut b = Note::default();
        let mut c = Note::default();
        let err = db.insert(&mut [&mut a, &mut b, &mut c]).unwrap_err();

        let Error::Batch(batch) = err else {
            panic!("expected batch error");
        };
        assert_eq!(batch.position, 1);
        assert_eq!(batch.total, 3);
        assert_eq!(batch.table, "note");
        assert!(matches!(*batch.source, Error::Query(_)));
        assert_eq!(conn.calls().len(), 2);
    }

    #[test]
    fn test_mixed_types_rejected_before_sql() {
        let (db, conn) = invoice_map();
        let mut inv = Invoice::default();
        let mut note = Note::default();

        let err = db.insert(&mut [&mut inv, &mut note]).unwrap_err();
        let Error::TypeMismatch(mismatch) = err else {
            panic!("expected type mismatch");
        };
        assert_eq!(mismatch.position, 1);
        assert!(conn.calls().is_empty());
    }

    #[test]
    fn test_empty_call_is_a_no_op() {
        let (db, conn) = invoice_map();
        db.insert(&mut []).unwrap();
        assert_eq!(db.update(&mut []).unwrap(), 0);
        assert!(conn.calls().is_empty());
    }

    #[test]
    fn test_unregistered_type_fails() {
        #[derive(Debug, Default, Record)]
        struct Stray {
            #[db("id, primarykey")]
            id: i64,
        }

        let (db, _conn) = invoice_map();
        let err = db.insert(&mut [&mut Stray::default()]).unwrap_err();
        assert!(err.is_registration());
    }

    #[test]
    fn test_get_binds_row() {
        let (db, conn) = invoice_map();
        conn.reply(Reply::Rows(rows(
            &["Id", "memo", "version"],
            vec![vec![
                Value::BigInt(1),
                Value::Text("first".into()),
                Value::BigInt(2),
            ]],
        )));

        let mut inv = Invoice::default();
        db.get(&mut inv, &[Value::BigInt(1)]).unwrap();

        assert_eq!(inv.memo, "first");
        assert_eq!(inv.version, 2);
        assert_eq!(
            conn.sql()[0],
            r#"SELECT "Id", "memo", "version" FROM "invoice" WHERE "Id" = ?"#
        );
    }

    #[test]
    fn test_get_missing_row() {
        let (db, _conn) = invoice_map();
        let err = db.get(&mut Invoice::default(), &[Value::BigInt(5)]).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_get_with_duplicate_key_rows() {
        let (db, conn) = invoice_map();
        conn.reply(Reply::Rows(rows(
            &["Id", "memo", "version"],
            vec![
                vec![Value::BigInt(3), Value::Text("a".into()), Value::BigInt(1)],
                vec![Value::BigInt(3), Value::Text("b".into()), Value::BigInt(1)],
            ],
        )));

        let mut inv = Invoice::default();
        let err = db.get(&mut inv, &[Value::BigInt(3)]).unwrap_err();

        let Error::MultipleRows(multiple) = err else {
            panic!("expected multiple rows error");
        };
        assert_eq!(multiple.table.as_deref(), Some("invoice"));
        assert_eq!(multiple.keys, vec![Value::BigInt(3)]);
        assert_eq!(multiple.count, 2);
        assert!(inv.memo.is_empty());
    }

    #[test]
    fn test_get_checks_key_count() {
        let (db, conn) = invoice_map();
        let err = db.get(&mut Invoice::default(), &[]).unwrap_err();
        assert_eq!(err.bind_kind(), Some(BindErrorKind::ParameterCount));
        assert!(conn.calls().is_empty());
    }

    #[test]
    fn test_exists_counts_rows() {
        let (db, conn) = invoice_map();
        conn.reply(Reply::Rows(rows(&["count"], vec![vec![Value::BigInt(1)]])));
        assert!(db.exists(RecordType::of::<Note>(), &[Value::BigInt(1)]).unwrap());
        assert!(!db.exists(RecordType::of::<Note>(), &[Value::BigInt(2)]).unwrap());
        assert_eq!(conn.sql()[0], r#"SELECT COUNT(*) FROM "note" WHERE "id" = ?"#);
    }

    #[test]
    fn test_statements_are_cached_per_table() {
        let (db, _conn) = invoice_map();
        let mut a = Note::default();
        let mut b = Note::default();
        db.insert(&mut [&mut a]).unwrap();
        db.insert(&mut [&mut b]).unwrap();
        assert_eq!(db.plans.len(), 1);

        db.update(&mut [&mut a]).unwrap();
        assert_eq!(db.plans.len(), 2);
    }

    #[test]
    fn test_hooks_surround_version_change() {
        let (db, _conn) = invoice_map();
        let mut t = Tracked {
            id: 1,
            ..Default::default()
        };
        db.insert(&mut [&mut t]).unwrap();
        db.update(&mut [&mut t]).unwrap();

        assert_eq!(
            t.events,
            vec![
                "pre_insert v0",
                "post_insert v1",
                "pre_update v1",
                "post_update v2",
            ]
        );
    }

    #[test]
    fn test_hook_runs_statements_through_the_executor() {
        let (db, conn) = invoice_map();
        let mut t = Tracked {
            id: 4,
            ver: 1,
            ..Default::default()
        };
        db.delete(&mut [&mut t]).unwrap();

        let calls = conn.calls();
        assert_eq!(calls[0].sql, "DELETE FROM child WHERE parent = ?");
        assert_eq!(calls[0].params, vec![Value::BigInt(4)]);
        assert!(calls[1].sql.starts_with(r#"DELETE FROM "tracked""#));
    }

    #[test]
    fn test_hook_error_aborts_record() {
        #[derive(Debug, Default, Record)]
        #[db(hooks)]
        struct Guarded {
            #[db("id, primarykey")]
            id: i64,
        }

        impl Hooks for Guarded {
            fn pre_insert(&mut self, _exec: &dyn SqlExecutor) -> Result<()> {
                Err(Error::custom("refused"))
            }
        }

        let conn = MockConnection::new();
        let mut db = DbMap::new(conn.clone(), SqliteDialect);
        db.add_table::<Guarded>("guarded").unwrap();

        let err = db.insert(&mut [&mut Guarded::default()]).unwrap_err();
        assert!(matches!(err, Error::Custom(_)));
        assert!(conn.calls().is_empty());
    }

    #[test]
    fn test_named_params_from_record() {
        let (db, conn) = invoice_map();
        let inv = Invoice {
            id: 3,
            memo: "x".into(),
            version: 1,
        };
        db.exec(
            "UPDATE invoice SET memo = :memo WHERE Id = :Id",
            &Params::record(&inv),
        )
        .unwrap();

        let calls = conn.calls();
        assert_eq!(calls[0].sql, "UPDATE invoice SET memo = ? WHERE Id = ?");
        assert_eq!(
            calls[0].params,
            vec![Value::Text("x".into()), Value::BigInt(3)]
        );
    }

    #[test]
    fn test_select_into_records_runs_post_get() {
        let (db, conn) = invoice_map();
        conn.reply(Reply::Rows(rows(
            &["id", "ver"],
            vec![
                vec![Value::BigInt(1), Value::BigInt(1)],
                vec![Value::BigInt(2), Value::BigInt(4)],
            ],
        )));

        let found: Vec<Tracked> = db.select("SELECT id, ver FROM tracked", &params!()).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[1].ver, 4);
        assert_eq!(found[0].events, vec!["post_get"]);
    }

    #[test]
    fn test_select_is_strict() {
        let (db, conn) = invoice_map();
        conn.reply(Reply::Rows(rows(
            &["id", "body", "extra_unmapped"],
            vec![vec![
                Value::BigInt(1),
                Value::Text("b".into()),
                Value::Int(0),
            ]],
        )));

        let mut dest: Vec<Note> = Vec::new();
        let err = db
            .select_into(&mut dest, "SELECT * FROM note", &params!())
            .unwrap_err();
        assert_eq!(err.bind_kind(), Some(BindErrorKind::UnmatchedColumn));
        assert!(dest.is_empty());
    }

    #[test]
    fn test_select_one_row_counts() {
        let (db, conn) = invoice_map();
        let err = db
            .select_one::<Note>("SELECT id, body FROM note", &params!())
            .unwrap_err();
        assert!(err.is_not_found());

        conn.reply(Reply::Rows(rows(
            &["id", "body"],
            vec![
                vec![Value::BigInt(1), Value::Text("a".into())],
                vec![Value::BigInt(2), Value::Text("b".into())],
            ],
        )));
        let err = db
            .select_one::<Note>("SELECT id, body FROM note", &params!())
            .unwrap_err();
        assert!(matches!(err, Error::MultipleRows(ref e) if e.count == 2));
    }

    #[test]
    fn test_scalar_selects() {
        let (db, conn) = invoice_map();
        assert_eq!(db.select_int("SELECT max(id) FROM note", &params!()).unwrap(), 0);
        assert_eq!(db.select_str("SELECT body FROM note", &params!()).unwrap(), "");

        conn.reply(Reply::Rows(rows(&["n"], vec![vec![Value::Null]])));
        assert_eq!(
            db.select_nullable_int("SELECT max(id) FROM note", &params!())
                .unwrap(),
            None
        );

        conn.reply(Reply::Rows(rows(&["avg"], vec![vec![Value::Double(2.5)]])));
        let avg = db.select_float("SELECT avg(id) FROM note", &params!()).unwrap();
        assert!((avg - 2.5).abs() < f64::EPSILON);

        conn.reply(Reply::Rows(rows(
            &["id"],
            vec![vec![Value::BigInt(1)], vec![Value::BigInt(2)]],
        )));
        let err = db.select_int("SELECT id FROM note", &params!()).unwrap_err();
        assert!(matches!(err, Error::MultipleRows(_)));

        conn.reply(Reply::Rows(rows(
            &["a", "b"],
            vec![vec![Value::BigInt(1), Value::BigInt(2)]],
        )));
        let err = db.select_int("SELECT 1, 2", &params!()).unwrap_err();
        assert_eq!(err.bind_kind(), Some(BindErrorKind::ColumnCount));
    }

    #[test]
    fn test_ddl_runs_in_registration_order() {
        let (db, conn) = invoice_map();
        db.create_tables_if_not_exists().unwrap();
        db.drop_tables_if_exists().unwrap();

        let sql = conn.sql();
        assert!(sql[0].starts_with(r#"CREATE TABLE IF NOT EXISTS "invoice""#));
        assert!(sql[2].starts_with(r#"CREATE TABLE IF NOT EXISTS "tracked""#));
        assert_eq!(sql[3], r#"DROP TABLE IF EXISTS "tracked""#);
        assert_eq!(sql[5], r#"DROP TABLE IF EXISTS "invoice""#);
        assert!(db.registry().tables().iter().all(TableMap::is_frozen));
    }

    #[test]
    fn test_setup_after_use_fails() {
        let (mut db, _conn) = invoice_map();
        db.insert(&mut [&mut Note::default()]).unwrap();

        let err = db
            .table_mut::<Note>()
            .unwrap()
            .rename_column("body", "text")
            .unwrap_err();
        assert_eq!(err.kind, tablemap_core::RegistrationErrorKind::Frozen);
    }
}
