//! Unit-of-work factories.

use super::unit_of_work::UnitOfWork;
use crate::db::{open_connection, ConfigError, ConnectionSettings, Connector, DbResult, SqliteConnector};
use std::sync::Arc;

/// Produces independent units of work.
pub trait UnitOfWorkFactory {
    /// Opens a new connection and begins a transaction on it.
    fn create(&self) -> DbResult<UnitOfWork>;
}

impl<F: UnitOfWorkFactory + ?Sized> UnitOfWorkFactory for &F {
    fn create(&self) -> DbResult<UnitOfWork> {
        (**self).create()
    }
}

impl<F: UnitOfWorkFactory + ?Sized> UnitOfWorkFactory for Arc<F> {
    fn create(&self) -> DbResult<UnitOfWork> {
        (**self).create()
    }
}

impl<F: UnitOfWorkFactory + ?Sized> UnitOfWorkFactory for Box<F> {
    fn create(&self) -> DbResult<UnitOfWork> {
        (**self).create()
    }
}

/// SQLite factory configured by a connection string.
///
/// Every `create()` call opens a fresh connection through `C`; nothing is
/// pooled or reused.
#[derive(Debug, Clone)]
pub struct SqliteUnitOfWorkFactory<C = SqliteConnector> {
    settings: ConnectionSettings,
    connector: C,
}

impl SqliteUnitOfWorkFactory {
    /// Validates `connection_string` and builds a factory using the default
    /// connector.
    ///
    /// # Errors
    /// - Returns `ConfigError` for empty, whitespace-only or otherwise invalid
    ///   connection strings.
    pub fn new(connection_string: &str) -> Result<Self, ConfigError> {
        Self::with_connector(connection_string, SqliteConnector)
    }
}

impl<C: Connector> SqliteUnitOfWorkFactory<C> {
    /// Builds a factory that opens connections through `connector`.
    pub fn with_connector(connection_string: &str, connector: C) -> Result<Self, ConfigError> {
        let settings = ConnectionSettings::parse(connection_string)?;
        Ok(Self {
            settings,
            connector,
        })
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }
}

impl<C: Connector> UnitOfWorkFactory for SqliteUnitOfWorkFactory<C> {
    fn create(&self) -> DbResult<UnitOfWork> {
        let conn = open_connection(&self.connector, &self.settings)?;
        UnitOfWork::begin(conn, self.settings.begin_mode())
    }
}
