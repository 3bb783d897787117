//! Repository functions — one function per database operation.
//!
//! Every function takes a `&DbPool` and returns a `Result<T, DbError>`.
//! No business logic, no domain types — pure SQL.

pub mod rules;
pub mod workflows;
pub mod executions;
pub mod logs;
pub mod rule_executions;
pub mod tasks;
pub mod scheduled_tasks;
pub mod workers;
pub mod inventory;
pub mod tenants;
pub mod sync_entities;
