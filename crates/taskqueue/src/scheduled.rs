//! Scheduled-task runner: one of the four cron-driven schedulers (spec
//! §4.1, §4.9). Reuses [`crate::service::TaskService`] to dispatch a
//! template-driven task on each fire.

use std::collections::HashMap;
use std::sync::Arc;

use cron_core::{CronCore, JobHandle};
use db::models::ScheduledTaskRow;
use db::DbPool;
use parking_lot::Mutex;
use tracing::{error, warn};
use uuid::Uuid;

use crate::error::QueueError;
use crate::service::TaskService;

/// Registers one cron entry per active scheduled task and dispatches a
/// template-driven task through [`TaskService`] on each fire.
pub struct ScheduledTaskRunner {
    pool: DbPool,
    service: Arc<TaskService>,
    cron: Arc<CronCore>,
    handles: Mutex<HashMap<Uuid, JobHandle>>,
}

impl ScheduledTaskRunner {
    pub fn new(pool: DbPool, service: Arc<TaskService>, cron: Arc<CronCore>) -> Arc<Self> {
        Arc::new(Self { pool, service, cron, handles: Mutex::new(HashMap::new()) })
    }

    /// Load every active scheduled task and register it with the cron core.
    pub async fn start(self: &Arc<Self>) -> Result<(), QueueError> {
        let tasks = db::repository::scheduled_tasks::list_active(&self.pool).await?;
        for t in tasks {
            if let Err(err) = self.register(&t).await {
                error!(scheduled_task_id = %t.id, error = %err, "failed to register scheduled task at startup");
            }
        }
        Ok(())
    }

    async fn register(self: &Arc<Self>, t: &ScheduledTaskRow) -> Result<(), QueueError> {
        let this = Arc::clone(self);
        let id = t.id;
        let handle = self.cron.add(&t.cron_expr, move || {
            let this = Arc::clone(&this);
            async move {
                this.fire(id).await;
            }
        })?;

        self.handles.lock().insert(t.id, handle);

        let next_fire_at = self.cron.next_fire_at(handle);
        db::repository::scheduled_tasks::set_next_run_at(&self.pool, t.id, next_fire_at).await?;
        Ok(())
    }

    /// Remove then re-add after an edit to a scheduled task's cron
    /// expression or target.
    pub async fn refresh(self: &Arc<Self>, id: Uuid) -> Result<(), QueueError> {
        self.remove(id);
        let t = db::repository::scheduled_tasks::get(&self.pool, id).await?;
        if t.is_active {
            self.register(&t).await?;
        }
        Ok(())
    }

    pub fn remove(&self, id: Uuid) {
        if let Some(handle) = self.handles.lock().remove(&id) {
            self.cron.remove(handle);
        }
    }

    async fn fire(&self, id: Uuid) {
        if let Err(err) = self.fire_inner(id).await {
            error!(scheduled_task_id = %id, error = %err, "scheduled task fire failed");
        }
    }

    async fn fire_inner(&self, id: Uuid) -> Result<(), QueueError> {
        let t = db::repository::scheduled_tasks::get(&self.pool, id).await?;
        if !t.is_active {
            return Ok(());
        }

        // Claim the slot with a synthetic marker before the real task id
        // exists — `try_start_run` enforces "at most one in-flight run"
        // (spec §4.9).
        let claim_marker = format!("claim-{}", Uuid::new_v4());
        let claimed = db::repository::scheduled_tasks::try_start_run(&self.pool, id, &claim_marker).await?;
        if !claimed {
            warn!(scheduled_task_id = %id, "scheduled task already running, skipping this fire");
            return Ok(());
        }

        let host_ids: Vec<Uuid> = serde_json::from_value(t.host_ids.clone())
            .map_err(|e| QueueError::InvalidVariables(format!("malformed host_ids: {e}")))?;

        let dispatch = self
            .service
            .create_from_template(
                t.tenant_id,
                "",
                t.template_id,
                host_ids,
                t.variables.clone(),
                "scheduled_task",
                None,
                "system",
                &t.name,
                5,
                t.timeout_mins.saturating_mul(60),
            )
            .await;

        match dispatch {
            Ok(task_id) => {
                db::repository::scheduled_tasks::set_last_task_id(&self.pool, id, &task_id).await?;
            }
            Err(err) => {
                warn!(scheduled_task_id = %id, error = %err, "failed to create task for scheduled task fire");
                db::repository::scheduled_tasks::finish_run(&self.pool, id, "failed").await?;
            }
        }

        Ok(())
    }
}
