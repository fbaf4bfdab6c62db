#![allow(dead_code)]

use dade_core::{
    DadeContext, Entity, KeyStrategy, SqliteUnitOfWorkFactory, UnitOfWork, UnitOfWorkFactory,
};
use rusqlite::types::Value;
use rusqlite::Row;
use tempfile::TempDir;

pub const CREATE_TEST_TABLE: &str =
    "CREATE TABLE Test (Id INTEGER PRIMARY KEY, Name TEXT NOT NULL)";

/// Temporary database file with the `Test` table already committed.
pub struct TestDb {
    _dir: TempDir,
    pub connection_string: String,
    pub factory: SqliteUnitOfWorkFactory,
}

impl TestDb {
    pub fn new() -> Self {
        let db = Self::empty();
        {
            let mut ctx = DadeContext::new(&db.factory);
            ctx.execute(CREATE_TEST_TABLE, ()).unwrap();
            ctx.commit().unwrap();
        }
        db
    }

    pub fn empty() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let connection_string = format!("Data Source={}", dir.path().join("dade.db").display());
        let factory = SqliteUnitOfWorkFactory::new(&connection_string).unwrap();
        Self {
            _dir: dir,
            connection_string,
            factory,
        }
    }

    /// Row count of `Test` as seen by a fresh transaction.
    pub fn committed_rows(&self) -> i64 {
        let mut uow = self.factory.create().unwrap();
        let count = uow
            .execute_scalar_i64("SELECT COUNT(*) FROM Test", ())
            .unwrap();
        uow.rollback().unwrap();
        count
    }

    pub fn open(&self) -> UnitOfWork {
        self.factory.create().unwrap()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRow {
    pub id: i64,
    pub name: String,
}

impl TestRow {
    pub fn named(name: &str) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
        }
    }
}

impl Entity for TestRow {
    type Key = i64;
    const TABLE: &'static str = "Test";
    const KEY_COLUMN: &'static str = "Id";
    const COLUMNS: &'static [&'static str] = &["Name"];
    const KEY_STRATEGY: KeyStrategy = KeyStrategy::Generated;

    fn key(&self) -> i64 {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![Value::Text(self.name.clone())]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("Id")?,
            name: row.get("Name")?,
        })
    }
}
