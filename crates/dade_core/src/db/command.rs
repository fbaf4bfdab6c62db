//! Raw statement helpers shared by the unit of work and the mappers.

use crate::model::params::SqlParams;
use rusqlite::{Connection, Row};

/// Runs a non-query statement and returns the number of changed rows.
pub fn execute(conn: &Connection, sql: &str, params: &SqlParams) -> rusqlite::Result<usize> {
    let mut stmt = conn.prepare_cached(sql)?;
    params.bind(&mut stmt)?;
    stmt.raw_execute()
}

/// Runs a scalar query.
///
/// No row and a `NULL` first column both read as `0`.
pub fn scalar_i64(conn: &Connection, sql: &str, params: &SqlParams) -> rusqlite::Result<i64> {
    let value = first_value::<i64>(conn, sql, params)?;
    Ok(value.unwrap_or(0))
}

/// Narrow variant of [`scalar_i64`]; values outside `i32` fail.
pub fn scalar_i32(conn: &Connection, sql: &str, params: &SqlParams) -> rusqlite::Result<i32> {
    let value = first_value::<i32>(conn, sql, params)?;
    Ok(value.unwrap_or(0))
}

/// Runs a query and maps every row through `map`.
pub fn query_map<T, F>(
    conn: &Connection,
    sql: &str,
    params: &SqlParams,
    mut map: F,
) -> rusqlite::Result<Vec<T>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare_cached(sql)?;
    params.bind(&mut stmt)?;
    let mut rows = stmt.raw_query();
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(map(row)?);
    }
    Ok(items)
}

fn first_value<T>(conn: &Connection, sql: &str, params: &SqlParams) -> rusqlite::Result<Option<T>>
where
    T: rusqlite::types::FromSql,
{
    let mut stmt = conn.prepare_cached(sql)?;
    params.bind(&mut stmt)?;
    let mut rows = stmt.raw_query();
    let value = rows
        .next()?
        .map(|row| row.get::<_, Option<T>>(0))
        .transpose()?;
    Ok(value.flatten())
}
