//! `engine` crate — workflow domain model, DAG validation, and the
//! execution interpreter (spec §4.4, §4.6).

pub mod dag;
pub mod error;
pub mod executor;
pub mod models;

pub use dag::{validate_dag, ParsedWorkflow};
pub use error::EngineError;
pub use executor::{ExecutorConfig, StartedExecution, WorkflowExecutor};
pub use models::{
    Connection, ErrorHandle, ExecutionSummary, NodeState, NodeType, TimelineEntry, Workflow, WorkflowDefinition,
    WorkflowNode,
};
