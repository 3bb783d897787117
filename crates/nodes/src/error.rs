//! Node-level error type.
//!
//! Unlike the teacher's original `Retryable`/`Fatal` split, retry policy
//! here is a workflow-level decision (`WorkflowNode::error_handle`, spec
//! §4.6 step 4) rather than something the node itself classifies — a node
//! simply reports that it failed, with an optional structured `detail`
//! blob for the execution log's `error` column.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct NodeError {
    pub message: String,
    pub detail: Option<Value>,
}

impl NodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), detail: None }
    }

    pub fn with_detail(message: impl Into<String>, detail: Value) -> Self {
        Self { message: message.into(), detail: Some(detail) }
    }
}
