//! Repository layer: generic sets and the mapping strategies behind them.
//!
//! # Responsibility
//! - Provide per-entity CRUD and query APIs over a shared transaction.
//! - Keep SQL generation inside an injectable `Mapper`.
//!
//! # Invariants
//! - Repositories never own or end the transaction they run in.
//! - Driver errors surface verbatim as `DbError::Sqlite`.

pub mod dade_set;
pub mod mapper;
