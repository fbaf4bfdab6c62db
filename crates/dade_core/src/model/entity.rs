//! Row-mapped entity contract.
//!
//! # Responsibility
//! - Describe how a record type maps onto one table.
//!
//! # Invariants
//! - `KEY_COLUMN` is a single-column primary key and is not listed in
//!   `COLUMNS`.
//! - `values()` yields exactly one value per entry of `COLUMNS`, in order.

use rusqlite::types::{ToSql, Value};
use rusqlite::Row;

/// How the primary key of a new row is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrategy {
    /// The database assigns the key (`INTEGER PRIMARY KEY` / rowid).
    Generated,
    /// The record carries its own key and it is written on insert.
    Explicit,
}

/// A plain record stored as one row of `TABLE`.
///
/// ```
/// use dade_core::{Entity, KeyStrategy};
/// use rusqlite::types::Value;
/// use rusqlite::Row;
///
/// struct Test {
///     id: i64,
///     name: String,
/// }
///
/// impl Entity for Test {
///     type Key = i64;
///     const TABLE: &'static str = "Test";
///     const KEY_COLUMN: &'static str = "Id";
///     const COLUMNS: &'static [&'static str] = &["Name"];
///     const KEY_STRATEGY: KeyStrategy = KeyStrategy::Generated;
///
///     fn key(&self) -> i64 {
///         self.id
///     }
///
///     fn values(&self) -> Vec<Value> {
///         vec![Value::Text(self.name.clone())]
///     }
///
///     fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
///         Ok(Self { id: row.get("Id")?, name: row.get("Name")? })
///     }
/// }
/// ```
pub trait Entity: Sized + Send + 'static {
    type Key: ToSql + Send + Sync + 'static;

    const TABLE: &'static str;
    const KEY_COLUMN: &'static str;
    /// Non-key columns, in the order `values()` produces them.
    const COLUMNS: &'static [&'static str];
    const KEY_STRATEGY: KeyStrategy = KeyStrategy::Generated;

    fn key(&self) -> Self::Key;

    fn values(&self) -> Vec<Value>;

    /// Decodes a row. Columns are looked up by name, so ad-hoc queries only
    /// need to select the mapped columns.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}
