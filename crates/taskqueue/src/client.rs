//! Bridges `task_execute`'s [`nodes::traits::TaskClient`] calls into the
//! [`crate::service::TaskService`] running in this process (spec §4.7/§4.8).

use std::sync::Arc;

use async_trait::async_trait;
use nodes::traits::{CreateTaskRequest, TaskClient, TaskStatusView};
use nodes::NodeError;

use crate::service::{CreateTaskParams, TaskService};

pub struct QueueTaskClient {
    service: Arc<TaskService>,
}

impl QueueTaskClient {
    pub fn new(service: Arc<TaskService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl TaskClient for QueueTaskClient {
    async fn create_and_enqueue(&self, req: CreateTaskRequest) -> Result<String, NodeError> {
        self.service
            .create_task(CreateTaskParams {
                tenant_id: req.tenant_id,
                tenant_name: String::new(),
                task_type: req.task_type,
                name: req.name,
                description: None,
                params: req.params,
                priority: req.priority,
                source: req.source,
                created_by: None,
                username: "workflow-engine".to_string(),
                timeout_seconds: req.timeout_seconds,
            })
            .await
            .map_err(|e| e.into())
    }

    async fn get_status(&self, task_id: &str) -> Result<TaskStatusView, NodeError> {
        let status = self.service.get_status_view(task_id).await.map_err(NodeError::from)?;
        Ok(TaskStatusView {
            status: status.status,
            progress: status.progress,
            result: status.result,
            error: status.error,
        })
    }

    async fn cancel(&self, task_id: &str) -> Result<(), NodeError> {
        self.service.cancel(task_id).await.map_err(NodeError::from)
    }
}
