//! Unit of work over one SQLite transaction.
//!
//! # Responsibility
//! - Own one open transaction and its connection until completion.
//! - Run raw statements and scalar queries inside that transaction.
//! - Commit, roll back, or dispose exactly once.
//!
//! # Invariants
//! - Commit failure always attempts a rollback before the commit error is
//!   returned.
//! - The connection is closed on every release path, including failures.
//! - After release, every operation fails with `TransactionCompleted`.

use super::transaction::{Transaction, TransactionStatus};
use crate::db::{command, BeginMode, DbResult};
use crate::model::params::SqlParams;
use log::{debug, error, info, warn};
use rusqlite::Connection;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

static NEXT_UOW_ID: AtomicU64 = AtomicU64::new(1);

/// One transactional boundary.
///
/// Dropping an open unit of work rolls it back (see [`UnitOfWork::dispose`]).
#[derive(Debug)]
pub struct UnitOfWork {
    id: u64,
    tx: Transaction,
}

impl UnitOfWork {
    /// Begins a transaction on an open connection.
    ///
    /// The connection must already be open and in autocommit mode; the
    /// factory opens it explicitly before calling this.
    pub fn begin(conn: Connection, mode: BeginMode) -> DbResult<Self> {
        let id = NEXT_UOW_ID.fetch_add(1, Ordering::Relaxed);
        match Transaction::begin(conn, mode) {
            Ok(tx) => {
                debug!("event=uow_begin module=uow status=ok uow_id={id} mode={mode:?}");
                Ok(Self { id, tx })
            }
            Err(err) => {
                error!("event=uow_begin module=uow status=error uow_id={id} error={err}");
                Err(err)
            }
        }
    }

    /// Shared handle used to bind repositories to this transaction.
    pub fn transaction(&self) -> Transaction {
        self.tx.clone()
    }

    pub fn status(&self) -> TransactionStatus {
        self.tx.status()
    }

    /// Runs a non-query statement and returns the number of changed rows.
    pub fn execute(&self, sql: &str, params: impl Into<SqlParams>) -> DbResult<usize> {
        let params = params.into();
        self.tx
            .with_connection(|conn| Ok(command::execute(conn, sql, &params)?))
    }

    /// Runs a scalar query; no row or `NULL` reads as `0`.
    pub fn execute_scalar_i32(&self, sql: &str, params: impl Into<SqlParams>) -> DbResult<i32> {
        let params = params.into();
        self.tx
            .with_connection(|conn| Ok(command::scalar_i32(conn, sql, &params)?))
    }

    /// Runs a scalar query; no row or `NULL` reads as `0`.
    pub fn execute_scalar_i64(&self, sql: &str, params: impl Into<SqlParams>) -> DbResult<i64> {
        let params = params.into();
        self.tx
            .with_connection(|conn| Ok(command::scalar_i64(conn, sql, &params)?))
    }

    /// Commits and releases the connection.
    ///
    /// If `COMMIT` fails the transaction is rolled back and the commit error
    /// is returned; the terminal status is then `RolledBack`.
    pub fn commit(&mut self) -> DbResult<()> {
        let started_at = Instant::now();
        let id = self.id;
        let result: DbResult<()> = self.tx.release(|conn| match conn.execute_batch("COMMIT;") {
            Ok(()) => {
                close_connection(id, conn);
                (TransactionStatus::Committed, Ok(()))
            }
            Err(err) => {
                if let Err(rollback_err) = conn.execute_batch("ROLLBACK;") {
                    error!(
                        "event=uow_commit module=uow status=error uow_id={id} error_code=rollback_after_commit_failed error={rollback_err}"
                    );
                }
                close_connection(id, conn);
                (TransactionStatus::RolledBack, Err(err.into()))
            }
        })?;

        match &result {
            Ok(()) => info!(
                "event=uow_commit module=uow status=ok uow_id={id} duration_ms={}",
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=uow_commit module=uow status=error uow_id={id} duration_ms={} error_code=commit_failed error={err}",
                started_at.elapsed().as_millis()
            ),
        }
        result
    }

    /// Rolls back and releases the connection.
    pub fn rollback(&mut self) -> DbResult<()> {
        let id = self.id;
        let result: DbResult<()> = self.tx.release(|conn| {
            let outcome = conn.execute_batch("ROLLBACK;").map_err(Into::into);
            close_connection(id, conn);
            (TransactionStatus::RolledBack, outcome)
        })?;

        match &result {
            Ok(()) => info!("event=uow_rollback module=uow status=ok uow_id={id}"),
            Err(err) => error!("event=uow_rollback module=uow status=error uow_id={id} error={err}"),
        }
        result
    }

    /// Releases the transaction if it is still open.
    ///
    /// Rolls back, closes the connection and marks the transaction
    /// `Disposed`. Calling it again, or after commit/rollback, does nothing.
    pub fn dispose(&mut self) {
        if !self.tx.is_open() {
            return;
        }

        let id = self.id;
        let released = self.tx.release(|conn| {
            if let Err(err) = conn.execute_batch("ROLLBACK;") {
                warn!("event=uow_dispose module=uow status=error uow_id={id} error={err}");
            }
            close_connection(id, conn);
            (TransactionStatus::Disposed, ())
        });
        if released.is_ok() {
            debug!("event=uow_dispose module=uow status=ok uow_id={id}");
        }
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn close_connection(id: u64, conn: Connection) {
    if let Err((_conn, err)) = conn.close() {
        warn!("event=db_close module=uow status=error uow_id={id} error={err}");
    }
}
