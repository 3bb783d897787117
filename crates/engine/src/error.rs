//! Engine-level error types (spec §4.4 parser, §4.6 executor).

use thiserror::Error;

/// Errors produced by the workflow engine (validation + execution).
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ Parser / validation errors (spec §4.4, evaluated in order) ------
    #[error("workflow has no nodes")]
    Empty,

    #[error("duplicate node id: '{0}'")]
    DuplicateNodeId(String),

    #[error("node '{0}' has no name")]
    MissingName(String),

    #[error("node '{node_id}' lists unknown next_nodes target '{target}'")]
    UnknownNextNode { node_id: String, target: String },

    #[error("connection references unknown node '{node_id}' ({side} side)")]
    UnknownConnectionEndpoint { node_id: String, side: &'static str },

    #[error("workflow must have exactly one start node, found {0}")]
    StartNodeCount(usize),

    #[error("workflow must have at least one end node")]
    NoEndNode,

    #[error("condition node '{0}' must have exactly 2 next_nodes")]
    ConditionArity(String),

    #[error("workflow graph contains a cycle")]
    CycleDetected,

    // ------ Execution errors ------
    #[error("node '{node_id}' failed: {message}")]
    NodeFailed { node_id: String, message: String },

    /// Persistence error from the db crate.
    #[error("database error: {0}")]
    Database(#[from] db::DbError),

    /// A node type with no registered executor.
    #[error("no executor registered for node type '{0}'")]
    UnknownNodeType(String),

    /// The workflow's `definition` JSON didn't parse into `WorkflowDefinition`.
    #[error("invalid workflow definition: {0}")]
    MalformedDefinition(String),

    /// Failed to round-trip a `NodeState`/summary through JSON for persistence.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
