//! The task service (spec §4.8): creates task records, enqueues them, and
//! mirrors status transitions between the database and the queue.

use std::sync::Arc;

use chrono::Utc;
use db::DbPool;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::QueueError;
use crate::queue::{QueueEntry, QueueStatus, TaskQueue};

/// Everything a caller supplies up front to create a task. `tenant_name`
/// and `username` are denormalized onto the queue message (spec §4.8's
/// enqueue signature) — resolved by the tenant/user CRUD services this
/// core treats as external collaborators (spec §1).
#[derive(Debug, Clone)]
pub struct CreateTaskParams {
    pub tenant_id: Uuid,
    pub tenant_name: String,
    pub task_type: String,
    pub name: String,
    pub description: Option<String>,
    pub params: Value,
    pub priority: i32,
    pub source: String,
    pub created_by: Option<Uuid>,
    pub username: String,
    pub timeout_seconds: i32,
}

/// A task template's declared parameter: spec §4.8 "validates variables
/// against the template's declared parameter schema".
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub options: Vec<String>,
}

pub struct TaskService {
    pool: DbPool,
    queue: Arc<TaskQueue>,
}

impl TaskService {
    pub fn new(pool: DbPool, queue: Arc<TaskQueue>) -> Self {
        Self { pool, queue }
    }

    pub fn queue(&self) -> Arc<TaskQueue> {
        Arc::clone(&self.queue)
    }

    /// Create, persist, and enqueue a task in one step (spec §4.8).
    ///
    /// Enqueue failure deletes the just-created row — best-effort atomicity
    /// since the queue publish and the DB insert are not in one transaction.
    pub async fn create_task(&self, params: CreateTaskParams) -> Result<String, QueueError> {
        let task_id = format!("task-{}", Uuid::new_v4());

        let row = db::repository::tasks::create_task(
            &self.pool,
            &task_id,
            params.tenant_id,
            &params.task_type,
            &params.name,
            params.description.as_deref(),
            params.params.clone(),
            params.priority,
            &params.source,
            params.created_by,
            params.timeout_seconds,
        )
        .await?;

        let entry = QueueEntry {
            task_id: row.task_id.clone(),
            task_type: params.task_type,
            tenant_id: params.tenant_id,
            tenant_name: params.tenant_name,
            created_by: params.created_by,
            username: params.username,
            source: params.source,
            priority: params.priority,
            params: params.params,
            enqueued_at: Utc::now(),
        };

        self.queue.enqueue(entry);

        match db::repository::tasks::mark_queued(&self.pool, &task_id).await {
            Ok(()) => {
                info!(task_id = %task_id, "task created and enqueued");
                Ok(task_id)
            }
            Err(e) => {
                warn!(task_id = %task_id, error = %e, "mark_queued failed, rolling back task row");
                self.queue.remove(&task_id);
                let _ = db::repository::tasks::delete_task(&self.pool, &task_id).await;
                Err(e.into())
            }
        }
    }

    /// Template-driven task creation (spec §4.8 "Template task creation"):
    /// validates the template, the hosts, and the supplied variables
    /// against the template's declared schema before delegating to
    /// [`Self::create_task`].
    #[allow(clippy::too_many_arguments)]
    pub async fn create_from_template(
        &self,
        tenant_id: Uuid,
        tenant_name: &str,
        template_id: Uuid,
        hosts: Vec<Uuid>,
        variables: Value,
        source: &str,
        created_by: Option<Uuid>,
        username: &str,
        name: &str,
        priority: i32,
        timeout_seconds: i32,
    ) -> Result<String, QueueError> {
        let template = db::repository::inventory::get_template(&self.pool, tenant_id, template_id)
            .await
            .map_err(|_| QueueError::TemplateUnavailable)?;

        if !template.is_active {
            return Err(QueueError::TemplateUnavailable);
        }

        if hosts.is_empty() {
            return Err(QueueError::InvalidVariables("at least one host is required".to_string()));
        }

        validate_variables(&template.param_schema, &variables)?;

        let packed = json!({
            "template_id": template_id,
            "variables": variables,
            "hosts": hosts,
        });

        self.create_task(CreateTaskParams {
            tenant_id,
            tenant_name: tenant_name.to_string(),
            task_type: "template".to_string(),
            name: name.to_string(),
            description: None,
            params: packed,
            priority,
            source: source.to_string(),
            created_by,
            username: username.to_string(),
            timeout_seconds,
        })
        .await
    }

    /// Mirrors a status/progress/worker change into both the database and
    /// the queue-backed status store (spec §4.8).
    pub async fn update_status(
        &self,
        task_id: &str,
        status: &str,
        progress: i32,
        worker_id: Option<&str>,
    ) -> Result<(), QueueError> {
        db::repository::tasks::update_status(&self.pool, task_id, status, progress, worker_id).await?;
        self.queue.set_status(
            task_id,
            QueueStatus { status: status.to_string(), progress, result: None, error: None },
        );
        Ok(())
    }

    /// Finalize a task as `success` or `failed` (spec §4.8 `set_result`).
    pub async fn set_result(
        &self,
        task_id: &str,
        result: Option<Value>,
        error_msg: Option<&str>,
    ) -> Result<(), QueueError> {
        db::repository::tasks::set_result(&self.pool, task_id, result.clone(), error_msg).await?;
        let status = if error_msg.is_some() { "failed" } else { "success" };
        self.queue.set_status(
            task_id,
            QueueStatus { status: status.to_string(), progress: 100, result, error: error_msg.map(String::from) },
        );
        Ok(())
    }

    /// Only `pending|queued|running` tasks may be cancelled (spec §4.8,
    /// §6 "already terminal").
    pub async fn cancel(&self, task_id: &str) -> Result<(), QueueError> {
        db::repository::tasks::cancel_task(&self.pool, task_id)
            .await
            .map_err(|e| match e {
                db::DbError::Constraint(_) => QueueError::AlreadyTerminal(task_id.to_string()),
                other => other.into(),
            })?;
        self.queue.set_status(
            task_id,
            QueueStatus { status: "cancelled".to_string(), progress: 0, result: None, error: None },
        );
        Ok(())
    }

    pub async fn append_log(
        &self,
        task_id: &str,
        level: &str,
        source: &str,
        host_name: Option<&str>,
        message: &str,
        data: Option<Value>,
    ) -> Result<(), QueueError> {
        db::repository::tasks::append_log(&self.pool, task_id, level, source, host_name, message, data).await?;
        Ok(())
    }

    pub async fn get_status_view(&self, task_id: &str) -> Result<crate::queue::QueueStatus, QueueError> {
        if let Some(status) = self.queue.get_status(task_id) {
            return Ok(status);
        }
        let row = db::repository::tasks::get_task(&self.pool, task_id).await?;
        Ok(QueueStatus { status: row.status, progress: row.progress, result: row.result, error: row.error })
    }
}

/// Validate `variables` against a template's declared parameter schema
/// (spec §4.8: types `string|select|multiselect|password|datetime`,
/// required flags, option membership).
fn validate_variables(schema: &Value, variables: &Value) -> Result<(), QueueError> {
    let specs: Vec<ParamSpec> = serde_json::from_value(schema.clone())
        .map_err(|e| QueueError::InvalidVariables(format!("malformed param schema: {e}")))?;

    let supplied = variables.as_object().cloned().unwrap_or_default();

    for spec in &specs {
        let value = supplied.get(&spec.name);

        if spec.required && value.map(Value::is_null).unwrap_or(true) {
            return Err(QueueError::InvalidVariables(format!("'{}' is required", spec.name)));
        }

        let Some(value) = value.filter(|v| !v.is_null()) else { continue };

        match spec.kind.as_str() {
            "string" | "password" | "datetime" => {
                if !value.is_string() {
                    return Err(QueueError::InvalidVariables(format!("'{}' must be a string", spec.name)));
                }
            }
            "select" => {
                let chosen = value.as_str().ok_or_else(|| {
                    QueueError::InvalidVariables(format!("'{}' must be a string", spec.name))
                })?;
                if !spec.options.is_empty() && !spec.options.iter().any(|o| o == chosen) {
                    return Err(QueueError::InvalidVariables(format!(
                        "'{}' must be one of {:?}", spec.name, spec.options
                    )));
                }
            }
            "multiselect" => {
                let chosen = value.as_array().ok_or_else(|| {
                    QueueError::InvalidVariables(format!("'{}' must be an array", spec.name))
                })?;
                if !spec.options.is_empty() {
                    for item in chosen {
                        let s = item.as_str().unwrap_or_default();
                        if !spec.options.iter().any(|o| o == s) {
                            return Err(QueueError::InvalidVariables(format!(
                                "'{}' contains an option not in {:?}", spec.name, spec.options
                            )));
                        }
                    }
                }
            }
            other => {
                return Err(QueueError::InvalidVariables(format!("unknown parameter type '{other}'")));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn required_field_missing_is_rejected() {
        let schema = json!([{"name": "disk", "type": "string", "required": true}]);
        let err = validate_variables(&schema, &json!({})).unwrap_err();
        assert!(matches!(err, QueueError::InvalidVariables(_)));
    }

    #[test]
    fn select_outside_options_is_rejected() {
        let schema = json!([{"name": "mode", "type": "select", "required": true, "options": ["fast", "safe"]}]);
        let err = validate_variables(&schema, &json!({"mode": "yolo"})).unwrap_err();
        assert!(matches!(err, QueueError::InvalidVariables(_)));
    }

    #[test]
    fn valid_variables_pass() {
        let schema = json!([
            {"name": "mode", "type": "select", "required": true, "options": ["fast", "safe"]},
            {"name": "note", "type": "string", "required": false}
        ]);
        assert!(validate_variables(&schema, &json!({"mode": "safe"})).is_ok());
    }

    #[test]
    fn multiselect_validates_each_item() {
        let schema = json!([{"name": "tags", "type": "multiselect", "required": true, "options": ["a", "b"]}]);
        assert!(validate_variables(&schema, &json!({"tags": ["a", "b"]})).is_ok());
        assert!(validate_variables(&schema, &json!({"tags": ["a", "c"]})).is_err());
    }
}
