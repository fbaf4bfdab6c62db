//! CLI demo host for `dade_core`.
//!
//! # Responsibility
//! - Exercise one full context lifecycle against a real database file.
//! - Print the committed rows as JSON lines for quick local checks.
//!
//! Usage: `dade_cli [connection-string] [name]`

use dade_core::{
    default_log_level, init_logging, DadeContext, DbResult, Entity, LogTarget, Repository,
    SqliteUnitOfWorkFactory,
};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::Serialize;
use std::ops::{Deref, DerefMut};
use std::process::ExitCode;

const DEFAULT_CONNECTION_STRING: &str = "Data Source=file.db";
const DEFAULT_NAME: &str = "dade";

#[derive(Debug, Serialize)]
struct DemoRow {
    id: i64,
    name: String,
}

impl Entity for DemoRow {
    type Key = i64;
    const TABLE: &'static str = "Test";
    const KEY_COLUMN: &'static str = "Id";
    const COLUMNS: &'static [&'static str] = &["Name"];

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

/// Application context: adds schema setup on top of the generic context.
struct DemoContext<'f>(DadeContext<&'f SqliteUnitOfWorkFactory>);

impl<'f> DemoContext<'f> {
    fn new(factory: &'f SqliteUnitOfWorkFactory) -> Self {
        Self(DadeContext::new(factory))
    }

    fn ensure_schema(&mut self) -> DbResult<()> {
        self.execute(
            "CREATE TABLE IF NOT EXISTS Test (Id INTEGER PRIMARY KEY, Name TEXT NOT NULL)",
            (),
        )?;
        Ok(())
    }
}

impl<'f> Deref for DemoContext<'f> {
    type Target = DadeContext<&'f SqliteUnitOfWorkFactory>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for DemoContext<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

fn main() -> ExitCode {
    let level = std::env::var("DADE_LOG").unwrap_or_else(|_| default_log_level().to_string());
    if let Err(err) = init_logging(&level, LogTarget::Stderr) {
        eprintln!("dade_cli: {err}");
        return ExitCode::FAILURE;
    }

    let mut args = std::env::args().skip(1);
    let connection_string = args
        .next()
        .or_else(|| std::env::var("DADE_CONNECTION_STRING").ok())
        .unwrap_or_else(|| DEFAULT_CONNECTION_STRING.to_string());
    let name = args.next().unwrap_or_else(|| DEFAULT_NAME.to_string());

    match run(&connection_string, &name) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("event=cli_run module=cli status=error error={err}");
            eprintln!("dade_cli: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(connection_string: &str, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let factory = SqliteUnitOfWorkFactory::new(connection_string)?;

    let mut writer = DemoContext::new(&factory);
    writer.ensure_schema()?;
    writer.set::<DemoRow>()?.add(&DemoRow {
        id: 0,
        name: name.to_string(),
    })?;
    writer.commit()?;

    let mut reader = DemoContext::new(&factory);
    let rows = reader.set::<DemoRow>()?.get_all()?;
    reader.rollback()?;

    for row in &rows {
        println!("{}", serde_json::to_string(row)?);
    }
    Ok(())
}
