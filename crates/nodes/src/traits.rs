//! The `ExecutableNode` contract and the collaborator traits a node may
//! call out to (spec §4.7, plus the external collaborators named in §1
//! and §9: host inventory, the task service, the ticket writer, and the
//! credential decryptor).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::NodeError;

/// Cooperative cancellation token threaded through every node executor
/// (spec §5 "execution cancellation is exposed via a cooperative context
/// token"). Cheap to clone; checked at suspension points.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A resolved host, as returned by [`HostLookup`].
#[derive(Debug, Clone)]
pub struct HostRef {
    pub id: Uuid,
    /// The identifier the caller matched on (ip or hostname) — echoed
    /// back so `task_execute` can report found/not-found by the original
    /// string the workflow author supplied.
    pub identifier: String,
}

/// Host inventory lookups needed by `task_execute` (spec §4.7). Host CRUD
/// itself is out of scope (spec §1); this is a read-only query surface.
#[async_trait]
pub trait HostLookup: Send + Sync {
    async fn find_by_ip(&self, tenant_id: Uuid, ip: &str) -> Result<Option<HostRef>, NodeError>;
    async fn find_by_hostname(&self, tenant_id: Uuid, hostname: &str) -> Result<Option<HostRef>, NodeError>;
}

/// A request to create and enqueue a task, as issued by `task_execute`.
#[derive(Debug, Clone)]
pub struct CreateTaskRequest {
    pub tenant_id: Uuid,
    pub task_type: String,
    pub name: String,
    pub params: Value,
    pub priority: i32,
    pub source: String,
    pub timeout_seconds: i32,
}

/// A point-in-time view of a dispatched task's status.
#[derive(Debug, Clone)]
pub struct TaskStatusView {
    pub status: String,
    pub progress: i32,
    pub result: Option<Value>,
    pub error: Option<String>,
}

impl TaskStatusView {
    pub fn is_terminal(&self) -> bool {
        matches!(self.status.as_str(), "success" | "failed" | "cancelled" | "timeout")
    }
}

/// The task service + queue bridge surface `task_execute` dispatches
/// through (spec §4.8). Implemented by `taskqueue::service` in the
/// running process; a mock implementation backs node unit tests.
#[async_trait]
pub trait TaskClient: Send + Sync {
    async fn create_and_enqueue(&self, req: CreateTaskRequest) -> Result<String, NodeError>;
    async fn get_status(&self, task_id: &str) -> Result<TaskStatusView, NodeError>;
    async fn cancel(&self, task_id: &str) -> Result<(), NodeError>;
}

/// `ticket_update` writes back through this collaborator — out of scope
/// per spec §1 ("ticket write-back" is the only ticket mutation surface
/// this core owns; the ticket CRUD service itself is external).
#[async_trait]
pub trait TicketWriter: Send + Sync {
    async fn update(&self, tenant_id: Uuid, ticket_id: Value, updates: Value) -> Result<(), NodeError>;
}

/// Credential material never touches this core as plaintext except
/// through this single decryption call (spec §9 "Credential handling").
#[async_trait]
pub trait CredentialService: Send + Sync {
    async fn decrypt(&self, credential_id: Uuid, tenant_id: Uuid) -> Result<Value, NodeError>;
}

/// Every collaborator a node might need, bundled so `ExecutionContext`
/// doesn't grow one field per trait.
#[derive(Clone)]
pub struct Collaborators {
    pub hosts: Arc<dyn HostLookup>,
    pub tasks: Arc<dyn TaskClient>,
    pub tickets: Arc<dyn TicketWriter>,
    pub credentials: Arc<dyn CredentialService>,
}

/// Shared state and collaborators passed to every node during execution.
///
/// `variables` is the execution's single mutable JSON object — it starts
/// out seeded with `global_context` (spec §4.6) and accumulates whatever
/// `data_process`/`task_execute` bind into it as the DAG is walked.
pub struct ExecutionContext<'a> {
    pub tenant_id: Uuid,
    pub execution_id: &'a str,
    pub node_id: &'a str,
    pub node_name: &'a str,
    pub variables: &'a mut Value,
    pub cancel: &'a CancelToken,
    pub collaborators: &'a Collaborators,
    /// Precomputed only for `ticket_update` nodes whose `updates.comment`
    /// sets `include_logs: true` — a rendered human-readable timeline of
    /// the execution so far (spec §4.7 ticket_update, §4.6 "summaries").
    pub rendered_log: Option<&'a str>,
}

/// What a node reports back on success.
#[derive(Debug, Clone)]
pub struct NodeOutcome {
    pub output: Value,
    /// `None` means "use the node's declared `next_nodes`"; `Some` lets a
    /// node override successor resolution (conditions branch, `control`
    /// terminate cuts off traversal with an empty list).
    pub next_nodes: Option<Vec<String>>,
}

impl NodeOutcome {
    pub fn simple(output: Value) -> Self {
        Self { output, next_nodes: None }
    }

    pub fn branching(output: Value, next_nodes: Vec<String>) -> Self {
        Self { output, next_nodes: Some(next_nodes) }
    }
}

/// The contract every node kind fulfils (spec §4.7).
#[async_trait]
pub trait ExecutableNode: Send + Sync {
    /// Execute the node. `config` is the node's own `config` JSON from the
    /// workflow definition.
    async fn execute(&self, config: &Value, ctx: &mut ExecutionContext<'_>) -> Result<NodeOutcome, NodeError>;
}
