//! Shared handle to one open transaction and its connection.
//!
//! # Responsibility
//! - Give repositories access to the connection while the transaction is open.
//! - Let only the owning unit of work end the transaction.
//!
//! # Invariants
//! - The connection lives in the handle until exactly one release path takes
//!   it; afterwards every access fails with `TransactionCompleted`.
//! - Access is serialised by a mutex, so concurrent callers never interleave
//!   statements on the connection.

use crate::db::{BeginMode, DbError, DbResult};
use rusqlite::Connection;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Lifecycle position of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Open,
    Committed,
    RolledBack,
    /// Released without an explicit commit or rollback.
    Disposed,
}

impl TransactionStatus {
    pub fn is_open(self) -> bool {
        self == Self::Open
    }
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Open => "open",
            Self::Committed => "committed",
            Self::RolledBack => "rolled back",
            Self::Disposed => "disposed",
        };
        f.write_str(label)
    }
}

#[derive(Debug)]
struct Slot {
    conn: Option<Connection>,
    status: TransactionStatus,
}

/// Cloneable, non-owning view of a unit of work's transaction.
///
/// Clones share the same connection. Holding a clone does not keep the
/// transaction open: once the unit of work commits, rolls back or is dropped,
/// all clones report the terminal status.
#[derive(Debug, Clone)]
pub struct Transaction {
    slot: Arc<Mutex<Slot>>,
}

impl Transaction {
    /// Begins a transaction on an already open connection.
    pub(crate) fn begin(conn: Connection, mode: BeginMode) -> DbResult<Self> {
        conn.execute_batch(mode.begin_sql())?;
        Ok(Self {
            slot: Arc::new(Mutex::new(Slot {
                conn: Some(conn),
                status: TransactionStatus::Open,
            })),
        })
    }

    pub fn status(&self) -> TransactionStatus {
        self.lock().status
    }

    pub fn is_open(&self) -> bool {
        self.status().is_open()
    }

    /// Returns true when both handles point at the same transaction.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }

    /// Runs `f` against the open connection.
    ///
    /// # Errors
    /// - `DbError::TransactionCompleted` once the transaction was released.
    /// - Whatever `f` returns.
    pub fn with_connection<R, F>(&self, f: F) -> DbResult<R>
    where
        F: FnOnce(&Connection) -> DbResult<R>,
    {
        let slot = self.lock();
        match slot.conn.as_ref() {
            Some(conn) => f(conn),
            None => Err(DbError::TransactionCompleted(slot.status)),
        }
    }

    /// Runs `f` against the open connection on tokio's blocking pool.
    ///
    /// The awaiting task yields while the driver call is outstanding. A panic
    /// inside `f` is resumed on the caller.
    pub async fn run_blocking<R, F>(&self, f: F) -> DbResult<R>
    where
        F: FnOnce(&Connection) -> DbResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let handle = self.clone();
        match tokio::task::spawn_blocking(move || handle.with_connection(f)).await {
            Ok(result) => result,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(_) => Err(DbError::Cancelled),
        }
    }

    /// Takes the connection out and records the status chosen by `f`.
    ///
    /// The lock is held for the whole release, so no statement can run
    /// between taking the connection and recording the terminal status.
    pub(crate) fn release<R, F>(&self, f: F) -> DbResult<R>
    where
        F: FnOnce(Connection) -> (TransactionStatus, R),
    {
        let mut slot = self.lock();
        let conn = slot
            .conn
            .take()
            .ok_or(DbError::TransactionCompleted(slot.status))?;
        let (status, result) = f(conn);
        slot.status = status;
        Ok(result)
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
