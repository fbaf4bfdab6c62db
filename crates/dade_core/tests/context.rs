mod common;

use common::{TestDb, TestRow};
use dade_core::{
    ContextState, DadeContext, DbError, DbResult, Repository, SqlParams, SqliteUnitOfWorkFactory,
    TransactionStatus, UnitOfWork, UnitOfWorkFactory,
};
use std::cell::Cell;

struct CountingFactory<'a> {
    inner: &'a SqliteUnitOfWorkFactory,
    created: Cell<usize>,
    fail_next: Cell<bool>,
}

impl<'a> CountingFactory<'a> {
    fn new(inner: &'a SqliteUnitOfWorkFactory) -> Self {
        Self {
            inner,
            created: Cell::new(0),
            fail_next: Cell::new(false),
        }
    }
}

impl UnitOfWorkFactory for CountingFactory<'_> {
    fn create(&self) -> DbResult<UnitOfWork> {
        if self.fail_next.replace(false) {
            return Err(DbError::Sqlite(rusqlite::Error::InvalidQuery));
        }
        self.created.set(self.created.get() + 1);
        self.inner.create()
    }
}

#[test]
fn unit_of_work_is_created_lazily_and_only_once() {
    let db = TestDb::new();
    let factory = CountingFactory::new(&db.factory);
    let mut ctx = DadeContext::new(&factory);

    assert_eq!(factory.created.get(), 0);
    assert!(matches!(ctx.state(), ContextState::NotStarted));

    ctx.execute("INSERT INTO Test (Name) VALUES ('a')", ()).unwrap();
    assert_eq!(factory.created.get(), 1);

    ctx.execute_scalar_i32("SELECT COUNT(*) FROM Test", ()).unwrap();
    let first = ctx.transaction().unwrap();
    let second = ctx.transaction().unwrap();
    assert!(first.ptr_eq(&second));
    assert_eq!(factory.created.get(), 1);

    ctx.commit().unwrap();
    assert_eq!(factory.created.get(), 1);
    assert!(matches!(
        ctx.state(),
        ContextState::Completed(TransactionStatus::Committed)
    ));
}

#[test]
fn commit_on_a_fresh_context_starts_and_completes_a_unit_of_work() {
    let db = TestDb::new();
    let factory = CountingFactory::new(&db.factory);
    let mut ctx = DadeContext::new(&factory);

    ctx.commit().unwrap();

    assert_eq!(factory.created.get(), 1);
    assert!(matches!(
        ctx.state(),
        ContextState::Completed(TransactionStatus::Committed)
    ));
}

#[test]
fn second_commit_fails_instead_of_silently_succeeding() {
    let db = TestDb::new();
    let factory = CountingFactory::new(&db.factory);
    let mut ctx = DadeContext::new(&factory);
    ctx.execute("INSERT INTO Test (Name) VALUES ('x')", ()).unwrap();

    ctx.commit().unwrap();
    let err = ctx.commit().unwrap_err();

    assert!(matches!(err, DbError::TransactionCompleted(TransactionStatus::Committed)));
    assert_eq!(factory.created.get(), 1);
    assert_eq!(db.committed_rows(), 1);
}

#[test]
fn any_operation_after_rollback_fails_fast() {
    let db = TestDb::new();
    let mut ctx = DadeContext::new(&db.factory);
    ctx.execute("INSERT INTO Test (Name) VALUES ('x')", ()).unwrap();
    ctx.rollback().unwrap();

    for err in [
        ctx.execute("DELETE FROM Test", ()).unwrap_err(),
        ctx.execute_scalar_i64("SELECT 1", ()).unwrap_err(),
        ctx.commit().unwrap_err(),
        ctx.rollback().unwrap_err(),
    ] {
        assert!(matches!(err, DbError::TransactionCompleted(TransactionStatus::RolledBack)));
    }
    assert!(ctx.set::<TestRow>().is_err());
    assert_eq!(db.committed_rows(), 0);
}

#[test]
fn factory_failure_leaves_context_not_started() {
    let db = TestDb::new();
    let factory = CountingFactory::new(&db.factory);
    factory.fail_next.set(true);
    let mut ctx = DadeContext::new(&factory);

    let err = ctx.execute("SELECT 1", ()).unwrap_err();
    assert!(matches!(err, DbError::Sqlite(rusqlite::Error::InvalidQuery)));
    assert!(matches!(ctx.state(), ContextState::NotStarted));

    ctx.execute("INSERT INTO Test (Name) VALUES ('retry')", ()).unwrap();
    ctx.commit().unwrap();
    assert_eq!(db.committed_rows(), 1);
}

#[test]
fn dropping_an_uncommitted_context_rolls_back() {
    let db = TestDb::new();
    let tx = {
        let mut ctx = DadeContext::new(&db.factory);
        ctx.execute("INSERT INTO Test (Name) VALUES ('x')", ()).unwrap();
        ctx.transaction().unwrap()
    };

    assert_eq!(tx.status(), TransactionStatus::Disposed);
    assert_eq!(db.committed_rows(), 0);
}

#[test]
fn sets_share_the_context_transaction() {
    let db = TestDb::new();
    let mut ctx = DadeContext::new(&db.factory);
    ctx.execute(
        "INSERT INTO Test (Name) VALUES (:name)",
        SqlParams::named([("name", String::from("via context"))]),
    )
    .unwrap();

    let set = ctx.set::<TestRow>().unwrap();
    let rows = set.get_all().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "via context");

    set.add(&TestRow::named("via set")).unwrap();
    assert_eq!(
        ctx.execute_scalar_i64("SELECT COUNT(*) FROM Test", ()).unwrap(),
        2
    );

    ctx.commit().unwrap();
    let err = set.get_all().unwrap_err();
    assert!(matches!(err, DbError::TransactionCompleted(TransactionStatus::Committed)));
    assert_eq!(db.committed_rows(), 2);
}

#[test]
fn end_to_end_schema_insert_and_read_back() {
    let db = TestDb::empty();
    let factory = SqliteUnitOfWorkFactory::new(&db.connection_string).unwrap();

    let mut schema = DadeContext::new(&factory);
    schema
        .execute("CREATE TABLE Test (Id INTEGER PRIMARY KEY, Name TEXT NOT NULL)", ())
        .unwrap();
    schema.commit().unwrap();

    let mut writer = DadeContext::new(&factory);
    writer.set::<TestRow>().unwrap().add(&TestRow::named("x")).unwrap();
    writer.commit().unwrap();

    let mut reader = DadeContext::new(&factory);
    let rows = reader.set::<TestRow>().unwrap().get_all().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "x");
    reader.rollback().unwrap();
}

#[test]
fn end_to_end_rollback_discards_insert() {
    let db = TestDb::new();

    let mut writer = DadeContext::new(&db.factory);
    writer.set::<TestRow>().unwrap().add(&TestRow::named("x")).unwrap();
    writer.rollback().unwrap();

    let mut reader = DadeContext::new(&db.factory);
    let rows = reader.set::<TestRow>().unwrap().get_all().unwrap();
    assert!(rows.is_empty());
}

#[test]
fn failed_commit_completes_the_context_as_rolled_back() {
    let db = TestDb::new();
    let mut ctx = DadeContext::new(&db.factory);
    ctx.execute(
        "CREATE TABLE Child (
            Id INTEGER PRIMARY KEY,
            TestId INTEGER NOT NULL REFERENCES Test(Id) DEFERRABLE INITIALLY DEFERRED
        )",
        (),
    )
    .unwrap();
    ctx.execute("INSERT INTO Child (TestId) VALUES (42)", ()).unwrap();

    assert!(matches!(ctx.commit().unwrap_err(), DbError::Sqlite(_)));
    assert!(matches!(
        ctx.state(),
        ContextState::Completed(TransactionStatus::RolledBack)
    ));

    let mut check = DadeContext::new(&db.factory);
    let tables = check
        .execute_scalar_i64(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'Child'",
            (),
        )
        .unwrap();
    assert_eq!(tables, 0);
}
