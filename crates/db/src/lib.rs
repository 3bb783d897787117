//! `db` crate — pure persistence layer.
//!
//! Provides a connection pool, typed row structs, and repository functions
//! for every table owned by the self-healing core. No business logic lives
//! here — recursive predicate compilation lives in `match_engine`, DAG and
//! execution semantics live in `engine`.

pub mod error;
pub mod pool;
pub mod repository;
pub mod models;

pub use pool::DbPool;
pub use error::DbError;
