//! Workflow domain model (spec §3 "Healing Workflow" / "Workflow Node", §6
//! "Workflow definition JSON").
//!
//! These types are the in-memory shape of the JSONB `definition` column on
//! `healing_workflows` — `WorkflowDefinition` round-trips through it
//! directly via serde.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// `error_handle` on a node — how a failure there affects the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorHandle {
    /// Abort the whole execution.
    Stop,
    /// Proceed with normal successor resolution as if the node had succeeded.
    Continue,
    /// Rerun the node, up to the workflow's `max_retries`.
    Retry,
}

impl Default for ErrorHandle {
    fn default() -> Self {
        Self::Stop
    }
}

/// One of the seven built-in node kinds (spec §4.7). Stored as the node's
/// `type` string; unknown types fail DAG validation rather than round-trip
/// as an opaque variant, since the registry has no executor for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Start,
    End,
    Condition,
    DataProcess,
    TaskExecute,
    Control,
    TicketUpdate,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
            Self::Condition => "condition",
            Self::DataProcess => "data_process",
            Self::TaskExecute => "task_execute",
            Self::Control => "control",
            Self::TicketUpdate => "ticket_update",
        }
    }
}

/// A single step in the workflow graph (spec §3 "Workflow Node").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowNode {
    /// Unique identifier within this workflow (referenced by `next_nodes`
    /// and `connections`).
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub name: String,
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub next_nodes: Vec<String>,
    #[serde(default)]
    pub error_handle: ErrorHandle,
}

/// Advisory visualization metadata (spec §4.4: "connections are advisory
/// metadata for visualization; execution is driven by `next_nodes`").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub condition: Option<String>,
}

/// The full `definition` JSON stored on `healing_workflows.definition`
/// (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub nodes: Vec<WorkflowNode>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub variables: HashMap<String, Value>,
}

/// One node's bookkeeping entry in `healing_executions.node_states`
/// (spec §4.6 "persist ... node_states").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeState {
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub attempts: u32,
    pub error: Option<String>,
}

/// The in-memory view of a `healing_workflows` row, parsed and ready to
/// execute — what `WorkflowExecutor` actually operates on (spec §4.6).
#[derive(Debug, Clone)]
pub struct Workflow {
    pub id: uuid::Uuid,
    pub tenant_id: uuid::Uuid,
    pub code: String,
    pub name: String,
    pub definition: WorkflowDefinition,
    pub timeout_seconds: i32,
    pub max_retries: i32,
    pub allow_parallel: bool,
    pub version: i32,
}

impl Workflow {
    /// Parse a persisted row's `definition` JSON into a `Workflow`.
    ///
    /// Does not re-run DAG validation — callers that need the validated
    /// view go through `engine::dag::validate_dag(&workflow.definition)`.
    pub fn from_row(row: &db::models::HealingWorkflowRow) -> Result<Self, crate::EngineError> {
        let definition: WorkflowDefinition = serde_json::from_value(row.definition.clone())
            .map_err(|e| crate::EngineError::MalformedDefinition(e.to_string()))?;
        Ok(Self {
            id: row.id,
            tenant_id: row.tenant_id,
            code: row.code.clone(),
            name: row.name.clone(),
            definition,
            timeout_seconds: row.timeout_seconds,
            max_retries: row.max_retries,
            allow_parallel: row.allow_parallel,
            version: row.version,
        })
    }
}

/// One node's entry in an [`ExecutionSummary`]'s human-readable timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub node_id: String,
    pub node_name: String,
    pub status: String,
    pub duration_ms: i64,
}

/// A condensed, human-readable report of a finished execution (spec §4.6
/// "summaries") — attachable to a ticket comment by `ticket_update` nodes
/// that reference it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub execution_id: String,
    pub status: String,
    pub duration_ms: i64,
    pub node_count: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub timeline: Vec<TimelineEntry>,
}

impl ExecutionSummary {
    /// Render the timeline as plain text, one line per node — what
    /// `ticket_update`'s `include_logs` option appends to a comment.
    pub fn render_text(&self) -> String {
        let mut out = format!(
            "Execution {} — {} ({} ms, {} succeeded / {} failed)",
            self.execution_id, self.status, self.duration_ms, self.succeeded, self.failed
        );
        for entry in &self.timeline {
            out.push('\n');
            out.push_str(&format!(
                "  [{}] {} — {} ({} ms)",
                entry.node_id, entry.node_name, entry.status, entry.duration_ms
            ));
        }
        out
    }
}
