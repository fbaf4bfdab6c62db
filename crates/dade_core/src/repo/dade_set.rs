//! Generic repository bound to a shared transaction.
//!
//! # Responsibility
//! - Expose CRUD and ad-hoc query operations for one entity type.
//! - Run every operation on the bound transaction's connection.
//!
//! # Invariants
//! - A set never ends the transaction it is bound to.
//! - `get` reports absence as `None`; `single` fails with `NoRows` or
//!   `MultipleRows` unless exactly one row matches.
//! - `any` always forwards its parameters to the count query.

use super::mapper::{ConventionMapper, Mapper};
use crate::db::{DbError, DbResult};
use crate::model::entity::Entity;
use crate::model::params::SqlParams;
use crate::uow::Transaction;
use std::marker::PhantomData;
use std::sync::Arc;

/// Synchronous repository contract for `T`.
pub trait Repository<T: Entity> {
    /// Fetches by primary key; `None` when absent.
    fn get(&self, id: T::Key) -> DbResult<Option<T>>;

    /// Inserts one row and returns its rowid.
    fn add(&self, entity: &T) -> DbResult<i64>;

    /// Inserts every entity; returns the number of rows inserted.
    fn add_many(&self, entities: &[T]) -> DbResult<usize>;

    /// Updates by primary key; `false` when the key does not exist.
    fn update(&self, entity: &T) -> DbResult<bool>;

    /// Returns the number of rows that matched a key.
    fn update_many(&self, entities: &[T]) -> DbResult<usize>;

    /// Deletes by primary key; `false` when the key does not exist.
    fn delete(&self, entity: &T) -> DbResult<bool>;

    /// Returns the number of rows removed.
    fn delete_many(&self, entities: &[T]) -> DbResult<usize>;

    /// Every row of the table. No paging.
    fn get_all(&self) -> DbResult<Vec<T>>;

    fn query(&self, sql: &str, params: impl Into<SqlParams>) -> DbResult<Vec<T>>;

    /// Exactly one row, else `NoRows` / `MultipleRows`.
    fn single(&self, sql: &str, params: impl Into<SqlParams>) -> DbResult<T>;

    /// Runs a caller-written count query; true iff the scalar is positive.
    fn any(&self, sql: &str, params: impl Into<SqlParams>) -> DbResult<bool>;

    /// Runs an arbitrary statement on the same transaction.
    fn execute(&self, sql: &str, params: impl Into<SqlParams>) -> DbResult<usize>;
}

/// Repository for `T` over a borrowed transaction.
///
/// The `*_async` methods mirror the synchronous ones. They move the driver
/// call onto tokio's blocking pool and must be awaited inside a tokio
/// runtime. Calls against one transaction still run one at a time.
pub struct DadeSet<T: Entity, M: Mapper<T> = ConventionMapper> {
    tx: Transaction,
    mapper: Arc<M>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> DadeSet<T> {
    pub fn new(tx: Transaction) -> Self {
        Self::with_mapper(tx, ConventionMapper)
    }
}

impl<T: Entity, M: Mapper<T>> DadeSet<T, M> {
    pub fn with_mapper(tx: Transaction, mapper: M) -> Self {
        Self {
            tx,
            mapper: Arc::new(mapper),
            _entity: PhantomData,
        }
    }

    pub fn transaction(&self) -> &Transaction {
        &self.tx
    }

    pub fn mapper(&self) -> &M {
        &self.mapper
    }

    pub async fn get_async(&self, id: T::Key) -> DbResult<Option<T>> {
        let mapper = Arc::clone(&self.mapper);
        self.tx
            .run_blocking(move |conn| mapper.get(conn, &id))
            .await
    }

    pub async fn add_async(&self, entity: T) -> DbResult<i64> {
        let mapper = Arc::clone(&self.mapper);
        self.tx
            .run_blocking(move |conn| mapper.insert(conn, &entity))
            .await
    }

    pub async fn add_many_async(&self, entities: Vec<T>) -> DbResult<usize> {
        let mapper = Arc::clone(&self.mapper);
        self.tx
            .run_blocking(move |conn| {
                for entity in &entities {
                    mapper.insert(conn, entity)?;
                }
                Ok(entities.len())
            })
            .await
    }

    pub async fn update_async(&self, entity: T) -> DbResult<bool> {
        let mapper = Arc::clone(&self.mapper);
        self.tx
            .run_blocking(move |conn| mapper.update(conn, &entity))
            .await
    }

    pub async fn update_many_async(&self, entities: Vec<T>) -> DbResult<usize> {
        let mapper = Arc::clone(&self.mapper);
        self.tx
            .run_blocking(move |conn| count_matches(&entities, |entity| mapper.update(conn, entity)))
            .await
    }

    pub async fn delete_async(&self, entity: T) -> DbResult<bool> {
        let mapper = Arc::clone(&self.mapper);
        self.tx
            .run_blocking(move |conn| mapper.delete(conn, &entity))
            .await
    }

    pub async fn delete_many_async(&self, entities: Vec<T>) -> DbResult<usize> {
        let mapper = Arc::clone(&self.mapper);
        self.tx
            .run_blocking(move |conn| count_matches(&entities, |entity| mapper.delete(conn, entity)))
            .await
    }

    pub async fn get_all_async(&self) -> DbResult<Vec<T>> {
        let mapper = Arc::clone(&self.mapper);
        self.tx.run_blocking(move |conn| mapper.get_all(conn)).await
    }

    pub async fn query_async(
        &self,
        sql: impl Into<String>,
        params: impl Into<SqlParams>,
    ) -> DbResult<Vec<T>> {
        let (mapper, sql, params) = (Arc::clone(&self.mapper), sql.into(), params.into());
        self.tx
            .run_blocking(move |conn| mapper.query(conn, &sql, &params))
            .await
    }

    pub async fn single_async(
        &self,
        sql: impl Into<String>,
        params: impl Into<SqlParams>,
    ) -> DbResult<T> {
        let rows = self.query_async(sql, params).await?;
        exactly_one(rows)
    }

    pub async fn any_async(
        &self,
        sql: impl Into<String>,
        params: impl Into<SqlParams>,
    ) -> DbResult<bool> {
        let (mapper, sql, params) = (Arc::clone(&self.mapper), sql.into(), params.into());
        self.tx
            .run_blocking(move |conn| Ok(mapper.scalar(conn, &sql, &params)? > 0))
            .await
    }

    pub async fn execute_async(
        &self,
        sql: impl Into<String>,
        params: impl Into<SqlParams>,
    ) -> DbResult<usize> {
        let (mapper, sql, params) = (Arc::clone(&self.mapper), sql.into(), params.into());
        self.tx
            .run_blocking(move |conn| mapper.execute(conn, &sql, &params))
            .await
    }
}

impl<T: Entity, M: Mapper<T>> Repository<T> for DadeSet<T, M> {
    fn get(&self, id: T::Key) -> DbResult<Option<T>> {
        self.tx.with_connection(|conn| self.mapper.get(conn, &id))
    }

    fn add(&self, entity: &T) -> DbResult<i64> {
        self.tx.with_connection(|conn| self.mapper.insert(conn, entity))
    }

    fn add_many(&self, entities: &[T]) -> DbResult<usize> {
        self.tx.with_connection(|conn| {
            for entity in entities {
                self.mapper.insert(conn, entity)?;
            }
            Ok(entities.len())
        })
    }

    fn update(&self, entity: &T) -> DbResult<bool> {
        self.tx.with_connection(|conn| self.mapper.update(conn, entity))
    }

    fn update_many(&self, entities: &[T]) -> DbResult<usize> {
        self.tx
            .with_connection(|conn| count_matches(entities, |entity| self.mapper.update(conn, entity)))
    }

    fn delete(&self, entity: &T) -> DbResult<bool> {
        self.tx.with_connection(|conn| self.mapper.delete(conn, entity))
    }

    fn delete_many(&self, entities: &[T]) -> DbResult<usize> {
        self.tx
            .with_connection(|conn| count_matches(entities, |entity| self.mapper.delete(conn, entity)))
    }

    fn get_all(&self) -> DbResult<Vec<T>> {
        self.tx.with_connection(|conn| self.mapper.get_all(conn))
    }

    fn query(&self, sql: &str, params: impl Into<SqlParams>) -> DbResult<Vec<T>> {
        let params = params.into();
        self.tx
            .with_connection(|conn| self.mapper.query(conn, sql, &params))
    }

    fn single(&self, sql: &str, params: impl Into<SqlParams>) -> DbResult<T> {
        exactly_one(self.query(sql, params)?)
    }

    fn any(&self, sql: &str, params: impl Into<SqlParams>) -> DbResult<bool> {
        let params = params.into();
        self.tx
            .with_connection(|conn| Ok(self.mapper.scalar(conn, sql, &params)? > 0))
    }

    fn execute(&self, sql: &str, params: impl Into<SqlParams>) -> DbResult<usize> {
        let params = params.into();
        self.tx
            .with_connection(|conn| self.mapper.execute(conn, sql, &params))
    }
}

impl<T: Entity, M: Mapper<T>> Clone for DadeSet<T, M> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            mapper: Arc::clone(&self.mapper),
            _entity: PhantomData,
        }
    }
}

fn count_matches<T, F>(entities: &[T], mut apply: F) -> DbResult<usize>
where
    F: FnMut(&T) -> DbResult<bool>,
{
    let mut matched = 0;
    for entity in entities {
        if apply(entity)? {
            matched += 1;
        }
    }
    Ok(matched)
}

fn exactly_one<T>(mut rows: Vec<T>) -> DbResult<T> {
    match rows.len() {
        0 => Err(DbError::NoRows),
        1 => Ok(rows.remove(0)),
        _ => Err(DbError::MultipleRows),
    }
}
