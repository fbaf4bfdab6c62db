//! SQLite connection bootstrap, command helpers and the shared error type.
//!
//! # Responsibility
//! - Parse connection strings into validated settings.
//! - Open and configure connections through a pluggable `Connector`.
//! - Run raw statements and scalar queries with bound `SqlParams`.
//!
//! # Invariants
//! - Driver errors are carried verbatim inside `DbError::Sqlite`.
//! - Nothing in this module begins or ends a transaction.

use crate::uow::TransactionStatus;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod command;
mod connection_string;
mod open;

pub use connection_string::{BeginMode, ConfigError, ConnectionSettings, OpenMode};
pub use open::{open_connection, Connector, SqliteConnector};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Config(ConfigError),
    Sqlite(rusqlite::Error),
    /// The transaction was already committed, rolled back or disposed.
    TransactionCompleted(TransactionStatus),
    /// A single-row query matched nothing.
    NoRows,
    /// A single-row query matched more than one row.
    MultipleRows,
    /// The blocking task behind an async call was cancelled.
    Cancelled,
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::TransactionCompleted(status) => {
                write!(f, "transaction already completed ({status})")
            }
            Self::NoRows => write!(f, "query returned no rows, expected exactly one"),
            Self::MultipleRows => write!(f, "query returned more than one row, expected exactly one"),
            Self::Cancelled => write!(f, "database task was cancelled"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Sqlite(err) => Some(err),
            Self::TransactionCompleted(_) | Self::NoRows | Self::MultipleRows | Self::Cancelled => {
                None
            }
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<ConfigError> for DbError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}
