//! Row structs that map 1-to-1 onto database tables.
//!
//! These are *persistence* models — they carry no business behaviour.
//! Domain types (with enums, invariants, and methods) live in the crate
//! that owns the concept: `engine`, `rulesvc`, `taskqueue`.

pub mod rules;
pub mod workflows;
pub mod executions;
pub mod tasks;
pub mod scheduled_tasks;
pub mod workers;
pub mod sync_entities;
pub mod inventory;
pub mod tenants;

pub use rules::{HealingRuleRow, HealingRuleExecutionRow};
pub use workflows::HealingWorkflowRow;
pub use executions::{HealingExecutionRow, HealingExecutionLogRow};
pub use tasks::{TaskRow, TaskLogRow};
pub use scheduled_tasks::ScheduledTaskRow;
pub use workers::WorkerConnectionRow;
pub use sync_entities::{GitRepositoryRow, TicketPluginRow};
pub use inventory::{TicketRow, HostRow, TaskTemplateRow};
pub use tenants::TenantRow;
