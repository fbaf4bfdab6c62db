//! Row mapping strategies.
//!
//! # Responsibility
//! - Translate entity operations into SQL against a borrowed connection.
//!
//! # Invariants
//! - Mappers never begin, commit or roll back; they run inside whatever
//!   transaction owns the connection.
//! - Identifiers coming from `Entity` metadata are always quoted.

use crate::db::{command, DbResult};
use crate::model::entity::{Entity, KeyStrategy};
use crate::model::params::SqlParams;
use rusqlite::types::{ToSql, Value};
use rusqlite::{Connection, Statement};

/// Capability set a `DadeSet` delegates to.
///
/// `query`, `execute` and `scalar` have convention-free defaults; the
/// key-based operations depend on the strategy.
pub trait Mapper<T: Entity>: Send + Sync + 'static {
    fn get(&self, conn: &Connection, id: &T::Key) -> DbResult<Option<T>>;

    /// Inserts one row and returns its rowid.
    fn insert(&self, conn: &Connection, entity: &T) -> DbResult<i64>;

    /// Returns `false` when no row has the entity's key.
    fn update(&self, conn: &Connection, entity: &T) -> DbResult<bool>;

    /// Returns `false` when no row has the entity's key.
    fn delete(&self, conn: &Connection, entity: &T) -> DbResult<bool>;

    fn get_all(&self, conn: &Connection) -> DbResult<Vec<T>>;

    fn query(&self, conn: &Connection, sql: &str, params: &SqlParams) -> DbResult<Vec<T>> {
        Ok(command::query_map(conn, sql, params, T::from_row)?)
    }

    fn execute(&self, conn: &Connection, sql: &str, params: &SqlParams) -> DbResult<usize> {
        Ok(command::execute(conn, sql, params)?)
    }

    fn scalar(&self, conn: &Connection, sql: &str, params: &SqlParams) -> DbResult<i64> {
        Ok(command::scalar_i64(conn, sql, params)?)
    }
}

/// Builds SQL from `Entity` metadata: one table, one key column, the listed
/// value columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConventionMapper;

impl<T: Entity> Mapper<T> for ConventionMapper {
    fn get(&self, conn: &Connection, id: &T::Key) -> DbResult<Option<T>> {
        let sql = format!(
            "{} WHERE {} = ?1;",
            select_sql::<T>(),
            quote_ident(T::KEY_COLUMN)
        );
        let mut stmt = conn.prepare_cached(&sql)?;
        stmt.raw_bind_parameter(1, id)?;
        let mut rows = stmt.raw_query();
        match rows.next()? {
            Some(row) => Ok(Some(T::from_row(row)?)),
            None => Ok(None),
        }
    }

    fn insert(&self, conn: &Connection, entity: &T) -> DbResult<i64> {
        let values = entity.values();
        let sql = insert_sql::<T>();
        let mut stmt = conn.prepare_cached(&sql)?;
        let next = match T::KEY_STRATEGY {
            KeyStrategy::Generated => 1,
            KeyStrategy::Explicit => {
                stmt.raw_bind_parameter(1, entity.key())?;
                2
            }
        };
        bind_values::<T>(&mut stmt, &values, next)?;
        stmt.raw_execute()?;
        Ok(conn.last_insert_rowid())
    }

    fn update(&self, conn: &Connection, entity: &T) -> DbResult<bool> {
        if T::COLUMNS.is_empty() {
            return key_exists::<T>(conn, &entity.key());
        }

        let assignments = T::COLUMNS
            .iter()
            .enumerate()
            .map(|(index, column)| format!("{} = ?{}", quote_ident(column), index + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?{};",
            quote_ident(T::TABLE),
            assignments,
            quote_ident(T::KEY_COLUMN),
            T::COLUMNS.len() + 1
        );

        let values = entity.values();
        let mut stmt = conn.prepare_cached(&sql)?;
        bind_values::<T>(&mut stmt, &values, 1)?;
        stmt.raw_bind_parameter(T::COLUMNS.len() + 1, entity.key())?;
        Ok(stmt.raw_execute()? > 0)
    }

    fn delete(&self, conn: &Connection, entity: &T) -> DbResult<bool> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?1;",
            quote_ident(T::TABLE),
            quote_ident(T::KEY_COLUMN)
        );
        let mut stmt = conn.prepare_cached(&sql)?;
        stmt.raw_bind_parameter(1, entity.key())?;
        Ok(stmt.raw_execute()? > 0)
    }

    fn get_all(&self, conn: &Connection) -> DbResult<Vec<T>> {
        let sql = format!("{};", select_sql::<T>());
        Ok(command::query_map(conn, &sql, &SqlParams::None, T::from_row)?)
    }
}

fn select_sql<T: Entity>() -> String {
    let columns = std::iter::once(T::KEY_COLUMN)
        .chain(T::COLUMNS.iter().copied())
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT {columns} FROM {}", quote_ident(T::TABLE))
}

fn insert_sql<T: Entity>() -> String {
    let mut columns = Vec::with_capacity(T::COLUMNS.len() + 1);
    if T::KEY_STRATEGY == KeyStrategy::Explicit {
        columns.push(T::KEY_COLUMN);
    }
    columns.extend(T::COLUMNS.iter().copied());

    if columns.is_empty() {
        return format!("INSERT INTO {} DEFAULT VALUES;", quote_ident(T::TABLE));
    }

    let names = columns
        .iter()
        .map(|column| quote_ident(column))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=columns.len())
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({names}) VALUES ({placeholders});",
        quote_ident(T::TABLE)
    )
}

fn key_exists<T: Entity>(conn: &Connection, key: &dyn ToSql) -> DbResult<bool> {
    let sql = format!(
        "SELECT COUNT(*) FROM {} WHERE {} = ?1;",
        quote_ident(T::TABLE),
        quote_ident(T::KEY_COLUMN)
    );
    let count: i64 = conn.query_row(&sql, [key], |row| row.get(0))?;
    Ok(count > 0)
}

fn bind_values<T: Entity>(
    stmt: &mut Statement<'_>,
    values: &[Value],
    first_index: usize,
) -> rusqlite::Result<()> {
    if values.len() != T::COLUMNS.len() {
        return Err(rusqlite::Error::InvalidParameterCount(
            values.len(),
            T::COLUMNS.len(),
        ));
    }
    for (offset, value) in values.iter().enumerate() {
        stmt.raw_bind_parameter(first_index + offset, value)?;
    }
    Ok(())
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::{insert_sql, quote_ident, select_sql};
    use crate::model::entity::{Entity, KeyStrategy};
    use rusqlite::types::Value;
    use rusqlite::Row;

    struct Tag {
        code: String,
        label: String,
    }

    impl Entity for Tag {
        type Key = String;
        const TABLE: &'static str = "Tag";
        const KEY_COLUMN: &'static str = "Code";
        const COLUMNS: &'static [&'static str] = &["Label"];
        const KEY_STRATEGY: KeyStrategy = KeyStrategy::Explicit;

        fn key(&self) -> String {
            self.code.clone()
        }

        fn values(&self) -> Vec<Value> {
            vec![Value::Text(self.label.clone())]
        }

        fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
            Ok(Self {
                code: row.get("Code")?,
                label: row.get("Label")?,
            })
        }
    }

    #[test]
    fn quote_ident_escapes_embedded_quotes() {
        assert_eq!(quote_ident("Name"), "\"Name\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn explicit_keys_are_written_on_insert() {
        assert_eq!(
            insert_sql::<Tag>(),
            "INSERT INTO \"Tag\" (\"Code\", \"Label\") VALUES (?1, ?2);"
        );
        assert_eq!(select_sql::<Tag>(), "SELECT \"Code\", \"Label\" FROM \"Tag\"");
    }
}
