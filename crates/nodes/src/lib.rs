//! `nodes` crate — the `ExecutableNode` trait and built-in node implementations
//! for the six workflow node kinds (spec §4.7: start, end, condition,
//! data_process, task_execute, control, ticket_update).
//!
//! Every node — built-in and plugin alike — must implement [`ExecutableNode`].
//! The engine crate dispatches execution through this trait object and owns
//! the DAG (node ids, declared `next_nodes`); this crate only knows how to
//! execute a single node's `config` against a shared [`traits::ExecutionContext`].

pub mod condition;
pub mod control;
pub mod data_process;
pub mod error;
pub mod registry;
pub mod start_end;
pub mod task_execute;
pub mod ticket_update;
pub mod traits;

#[cfg(test)]
pub mod mock;

pub use error::NodeError;
pub use registry::{default_registry, NodeRegistry};
pub use traits::{
    CancelToken, Collaborators, CreateTaskRequest, CredentialService, ExecutableNode, ExecutionContext,
    HostLookup, HostRef, NodeOutcome, TaskClient, TaskStatusView, TicketWriter,
};
