//! Transaction lifecycle: unit of work, factory and context.
//!
//! # Responsibility
//! - Open one connection per unit of work and begin a transaction on it.
//! - End that transaction through exactly one of commit, rollback or dispose.
//! - Start a context's unit of work lazily on first use.
//!
//! # Invariants
//! - One live transaction per `UnitOfWork`.
//! - Released transactions reject further use instead of silently no-oping.

mod context;
mod factory;
mod transaction;
mod unit_of_work;

pub use context::{ContextState, DadeContext};
pub use factory::{SqliteUnitOfWorkFactory, UnitOfWorkFactory};
pub use transaction::{Transaction, TransactionStatus};
pub use unit_of_work::UnitOfWork;
