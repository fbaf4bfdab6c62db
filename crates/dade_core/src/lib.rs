//! Transactional data access over SQLite.
//!
//! A `DadeContext` lazily opens one `UnitOfWork` from a factory; `DadeSet`s
//! bound to its transaction provide CRUD and query operations for entity
//! types; the context commits or rolls the whole unit back.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod uow;

pub use db::{
    BeginMode, ConfigError, ConnectionSettings, Connector, DbError, DbResult, OpenMode,
    SqliteConnector,
};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use model::entity::{Entity, KeyStrategy};
pub use model::params::SqlParams;
pub use repo::dade_set::{DadeSet, Repository};
pub use repo::mapper::{ConventionMapper, Mapper};
pub use uow::{
    ContextState, DadeContext, SqliteUnitOfWorkFactory, Transaction, TransactionStatus,
    UnitOfWork, UnitOfWorkFactory,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
