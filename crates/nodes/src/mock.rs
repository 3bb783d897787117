//! Test doubles for `ExecutableNode` collaborators.
//!
//! Each built-in node's unit tests construct a [`TestHarness`] and
//! configure only the collaborator behaviour that test cares about;
//! everything else falls back to an inert default.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::traits::{
    CancelToken, Collaborators, CreateTaskRequest, ExecutionContext, HostLookup, HostRef,
    TaskClient, TaskStatusView, TicketWriter,
};
use crate::{CredentialService, NodeError};

/// An in-memory host directory keyed by ip/hostname.
pub struct MockHostLookup {
    pub by_ip: Mutex<HashMap<String, HostRef>>,
    pub by_hostname: Mutex<HashMap<String, HostRef>>,
}

impl MockHostLookup {
    pub fn new() -> Self {
        Self { by_ip: Mutex::new(HashMap::new()), by_hostname: Mutex::new(HashMap::new()) }
    }

    pub fn with_ip(self, ip: &str, id: Uuid) -> Self {
        self.by_ip.lock().unwrap().insert(ip.to_string(), HostRef { id, identifier: ip.to_string() });
        self
    }

    pub fn with_hostname(self, hostname: &str, id: Uuid) -> Self {
        self.by_hostname
            .lock()
            .unwrap()
            .insert(hostname.to_string(), HostRef { id, identifier: hostname.to_string() });
        self
    }
}

#[async_trait]
impl HostLookup for MockHostLookup {
    async fn find_by_ip(&self, _tenant_id: Uuid, ip: &str) -> Result<Option<HostRef>, NodeError> {
        Ok(self.by_ip.lock().unwrap().get(ip).cloned())
    }

    async fn find_by_hostname(&self, _tenant_id: Uuid, hostname: &str) -> Result<Option<HostRef>, NodeError> {
        Ok(self.by_hostname.lock().unwrap().get(hostname).cloned())
    }
}

/// Always resolves every created task to a fixed terminal status.
pub struct MockTaskClient {
    pub created: Mutex<Vec<CreateTaskRequest>>,
    pub terminal_status: String,
    pub result: Option<Value>,
}

impl MockTaskClient {
    pub fn succeeding() -> Self {
        Self {
            created: Mutex::new(Vec::new()),
            terminal_status: "success".to_string(),
            result: Some(serde_json::json!({"success": 1, "failed": 0, "total": 1})),
        }
    }
}

#[async_trait]
impl TaskClient for MockTaskClient {
    async fn create_and_enqueue(&self, req: CreateTaskRequest) -> Result<String, NodeError> {
        let id = format!("task-{}", self.created.lock().unwrap().len() + 1);
        self.created.lock().unwrap().push(req);
        Ok(id)
    }

    async fn get_status(&self, _task_id: &str) -> Result<TaskStatusView, NodeError> {
        Ok(TaskStatusView {
            status: self.terminal_status.clone(),
            progress: 100,
            result: self.result.clone(),
            error: None,
        })
    }

    async fn cancel(&self, _task_id: &str) -> Result<(), NodeError> {
        Ok(())
    }
}

pub struct MockTicketWriter {
    pub calls: Mutex<Vec<(Value, Value)>>,
    pub fail: bool,
}

impl MockTicketWriter {
    pub fn new() -> Self {
        Self { calls: Mutex::new(Vec::new()), fail: false }
    }
}

#[async_trait]
impl TicketWriter for MockTicketWriter {
    async fn update(&self, _tenant_id: Uuid, ticket_id: Value, updates: Value) -> Result<(), NodeError> {
        if self.fail {
            return Err(NodeError::new("ticket writer unavailable"));
        }
        self.calls.lock().unwrap().push((ticket_id, updates));
        Ok(())
    }
}

pub struct MockCredentialService;

#[async_trait]
impl CredentialService for MockCredentialService {
    async fn decrypt(&self, _credential_id: Uuid, _tenant_id: Uuid) -> Result<Value, NodeError> {
        Ok(serde_json::json!({}))
    }
}

/// Bundles an owned `Collaborators` plus the identifiers an
/// `ExecutionContext` needs, so tests can build one without juggling
/// lifetimes by hand.
pub struct TestHarness {
    pub tenant_id: Uuid,
    pub execution_id: String,
    pub node_id: String,
    pub node_name: String,
    pub cancel: CancelToken,
    pub collaborators: Collaborators,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_collaborators(Collaborators {
            hosts: std::sync::Arc::new(MockHostLookup::new()),
            tasks: std::sync::Arc::new(MockTaskClient::succeeding()),
            tickets: std::sync::Arc::new(MockTicketWriter::new()),
            credentials: std::sync::Arc::new(MockCredentialService),
        })
    }

    pub fn with_collaborators(collaborators: Collaborators) -> Self {
        Self {
            tenant_id: Uuid::nil(),
            execution_id: "exec-test".to_string(),
            node_id: "node-test".to_string(),
            node_name: "test node".to_string(),
            cancel: CancelToken::new(),
            collaborators,
        }
    }

    pub fn ctx<'a>(&'a self, variables: &'a mut Value) -> ExecutionContext<'a> {
        ExecutionContext {
            tenant_id: self.tenant_id,
            execution_id: &self.execution_id,
            node_id: &self.node_id,
            node_name: &self.node_name,
            variables,
            cancel: &self.cancel,
            collaborators: &self.collaborators,
            rendered_log: None,
        }
    }
}
