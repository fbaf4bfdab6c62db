//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open connections through a caller-selected `Connector`.
//! - Configure connection pragmas requested by the settings.
//!
//! # Invariants
//! - Returned connections are open, in autocommit mode, with `busy_timeout`
//!   and `foreign_keys` applied.
//! - Log events carry the open mode but never the data source path.

use super::{ConnectionSettings, DbResult};
use log::{error, info};
use rusqlite::Connection;
use std::time::Instant;

/// Chooses how a connection is physically opened.
///
/// This is the connection-type selector for a factory. The default
/// `SqliteConnector` opens the configured data source with the configured
/// flags; tests and embedders can supply their own.
pub trait Connector: Send + Sync {
    fn connect(&self, settings: &ConnectionSettings) -> rusqlite::Result<Connection>;
}

/// Opens `settings.data_source()` with `settings.open_flags()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteConnector;

impl Connector for SqliteConnector {
    fn connect(&self, settings: &ConnectionSettings) -> rusqlite::Result<Connection> {
        Connection::open_with_flags(settings.data_source(), settings.open_flags())
    }
}

/// Opens and configures a connection.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_connection<C>(connector: &C, settings: &ConnectionSettings) -> DbResult<Connection>
where
    C: Connector + ?Sized,
{
    let started_at = Instant::now();
    let mode = settings.mode_label();
    info!("event=db_open module=db status=start mode={mode}");

    let conn = match connector.connect(settings) {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match configure_connection(&conn, settings) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={} duration_ms={}",
                mode,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_configure_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err.into())
        }
    }
}

fn configure_connection(conn: &Connection, settings: &ConnectionSettings) -> rusqlite::Result<()> {
    conn.busy_timeout(settings.busy_timeout())?;
    let foreign_keys = if settings.foreign_keys() { "ON" } else { "OFF" };
    conn.execute_batch(&format!("PRAGMA foreign_keys = {foreign_keys};"))?;
    Ok(())
}
