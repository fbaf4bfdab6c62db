//! Context owning one lazily created unit of work.
//!
//! # Responsibility
//! - Defer opening a connection until the first operation needs one.
//! - Forward execute/commit/rollback calls verbatim.
//!
//! # Invariants
//! - The unit of work is created at most once per context.
//! - Once committed or rolled back, the context stays `Completed` and every
//!   call fails with `TransactionCompleted`.

use super::factory::UnitOfWorkFactory;
use super::transaction::{Transaction, TransactionStatus};
use super::unit_of_work::UnitOfWork;
use crate::db::{DbError, DbResult};
use crate::model::entity::Entity;
use crate::model::params::SqlParams;
use crate::repo::dade_set::DadeSet;
use crate::repo::mapper::Mapper;
use log::debug;

/// Lifecycle of a context's unit of work.
#[derive(Debug)]
pub enum ContextState {
    NotStarted,
    Active(UnitOfWork),
    Completed(TransactionStatus),
}

/// One transactional unit of work, started on demand.
///
/// Application contexts usually wrap this type and deref to it:
///
/// ```no_run
/// use dade_core::{DadeContext, DbResult, SqliteUnitOfWorkFactory};
/// use std::ops::{Deref, DerefMut};
///
/// struct AppContext<'f>(DadeContext<&'f SqliteUnitOfWorkFactory>);
///
/// impl AppContext<'_> {
///     fn create_schema(&mut self) -> DbResult<()> {
///         self.execute("CREATE TABLE Test (Id INTEGER PRIMARY KEY, Name TEXT NOT NULL)", ())?;
///         self.commit()
///     }
/// }
///
/// impl<'f> Deref for AppContext<'f> {
///     type Target = DadeContext<&'f SqliteUnitOfWorkFactory>;
///     fn deref(&self) -> &Self::Target {
///         &self.0
///     }
/// }
///
/// impl DerefMut for AppContext<'_> {
///     fn deref_mut(&mut self) -> &mut Self::Target {
///         &mut self.0
///     }
/// }
/// ```
#[derive(Debug)]
pub struct DadeContext<F: UnitOfWorkFactory> {
    factory: F,
    state: ContextState,
}

impl<F: UnitOfWorkFactory> DadeContext<F> {
    /// Creates a context. No connection is opened here.
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            state: ContextState::NotStarted,
        }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn state(&self) -> &ContextState {
        &self.state
    }

    /// Returns the unit of work, creating it on first use.
    ///
    /// # Errors
    /// - `TransactionCompleted` after commit or rollback.
    /// - Factory errors; the context then stays `NotStarted`.
    pub fn unit_of_work(&mut self) -> DbResult<&mut UnitOfWork> {
        match &mut self.state {
            ContextState::Active(uow) => Ok(uow),
            ContextState::Completed(status) => Err(DbError::TransactionCompleted(*status)),
            state @ ContextState::NotStarted => {
                let uow = self.factory.create()?;
                debug!("event=context_start module=context status=ok");
                *state = ContextState::Active(uow);
                match state {
                    ContextState::Active(uow) => Ok(uow),
                    _ => Err(DbError::TransactionCompleted(TransactionStatus::Disposed)),
                }
            }
        }
    }

    /// Handle to the context's transaction, for binding repositories.
    pub fn transaction(&mut self) -> DbResult<Transaction> {
        Ok(self.unit_of_work()?.transaction())
    }

    /// Repository for `T` bound to this context's transaction.
    pub fn set<T: Entity>(&mut self) -> DbResult<DadeSet<T>> {
        Ok(DadeSet::new(self.transaction()?))
    }

    /// Repository for `T` using a caller-supplied mapping strategy.
    pub fn set_with_mapper<T, M>(&mut self, mapper: M) -> DbResult<DadeSet<T, M>>
    where
        T: Entity,
        M: Mapper<T>,
    {
        Ok(DadeSet::with_mapper(self.transaction()?, mapper))
    }

    pub fn execute(&mut self, sql: &str, params: impl Into<SqlParams>) -> DbResult<usize> {
        self.unit_of_work()?.execute(sql, params)
    }

    pub fn execute_scalar_i32(&mut self, sql: &str, params: impl Into<SqlParams>) -> DbResult<i32> {
        self.unit_of_work()?.execute_scalar_i32(sql, params)
    }

    pub fn execute_scalar_i64(&mut self, sql: &str, params: impl Into<SqlParams>) -> DbResult<i64> {
        self.unit_of_work()?.execute_scalar_i64(sql, params)
    }

    /// Commits the unit of work; the context is `Completed` afterwards even
    /// when the commit fails.
    pub fn commit(&mut self) -> DbResult<()> {
        let uow = self.unit_of_work()?;
        let result = uow.commit();
        let status = uow.status();
        self.state = ContextState::Completed(status);
        result
    }

    /// Rolls back the unit of work; the context is `Completed` afterwards.
    pub fn rollback(&mut self) -> DbResult<()> {
        let uow = self.unit_of_work()?;
        let result = uow.rollback();
        let status = uow.status();
        self.state = ContextState::Completed(status);
        result
    }
}
