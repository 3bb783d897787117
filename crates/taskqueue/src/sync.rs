//! Git-repository and ticket-plugin sync schedulers (spec §1 "scheduler
//! federation", §3, §6 "Pub/sub notifications"). Both entities are external
//! configuration — this core owns only their sync timer and publishes a
//! notification when it fires; the actual sync work runs on the worker
//! side and is out of scope.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use cron_core::{CronCore, JobHandle};
use db::DbPool;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::error;
use uuid::Uuid;

use crate::error::QueueError;

/// One pub/sub message published on a sync fire (spec §6: channel
/// `git:sync:<repository_id>` or the analogous ticket-sync channel).
#[derive(Debug, Clone, Serialize)]
pub struct SyncNotification {
    pub channel: String,
    pub action: String,
    pub repository_id: Uuid,
    pub tenant_id: Uuid,
    pub operator_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
}

/// In-process pub/sub bridge. The worker-side wire transport that actually
/// drains this is out of scope (spec §1) — this channel is the hand-off
/// point a future bridge would subscribe to.
#[derive(Clone)]
pub struct SyncNotifier {
    sender: broadcast::Sender<SyncNotification>,
}

impl SyncNotifier {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncNotification> {
        self.sender.subscribe()
    }

    fn publish(&self, notification: SyncNotification) {
        // No subscribers yet is not an error — workers may connect later.
        let _ = self.sender.send(notification);
    }
}

impl Default for SyncNotifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns the `git_repositories` sync timer.
pub struct GitSyncScheduler {
    pool: DbPool,
    cron: Arc<CronCore>,
    notifier: SyncNotifier,
    handles: Mutex<HashMap<Uuid, JobHandle>>,
}

impl GitSyncScheduler {
    pub fn new(pool: DbPool, cron: Arc<CronCore>, notifier: SyncNotifier) -> Arc<Self> {
        Arc::new(Self { pool, cron, notifier, handles: Mutex::new(HashMap::new()) })
    }

    pub async fn start(self: &Arc<Self>) -> Result<(), QueueError> {
        let repos = db::repository::sync_entities::list_active_git_repositories(&self.pool).await?;
        for repo in repos {
            let Some(cron_expr) = repo.sync_cron.clone() else { continue };
            if let Err(err) = self.register(repo.id, &cron_expr).await {
                error!(repository_id = %repo.id, error = %err, "failed to register git sync at startup");
            }
        }
        Ok(())
    }

    async fn register(self: &Arc<Self>, repository_id: Uuid, cron_expr: &str) -> Result<(), QueueError> {
        let this = Arc::clone(self);
        let handle = self.cron.add(cron_expr, move || {
            let this = Arc::clone(&this);
            async move {
                this.fire(repository_id).await;
            }
        })?;

        self.handles.lock().insert(repository_id, handle);
        let next_fire_at = self.cron.next_fire_at(handle);
        db::repository::sync_entities::set_git_next_run_at(&self.pool, repository_id, next_fire_at).await?;
        Ok(())
    }

    pub fn remove(&self, repository_id: Uuid) {
        if let Some(handle) = self.handles.lock().remove(&repository_id) {
            self.cron.remove(handle);
        }
    }

    pub async fn refresh(self: &Arc<Self>, repository_id: Uuid) -> Result<(), QueueError> {
        self.remove(repository_id);
        let repo = db::repository::sync_entities::get_git_repository(&self.pool, repository_id).await?;
        if let Some(cron_expr) = repo.sync_cron.filter(|_| repo.sync_enabled) {
            self.register(repository_id, &cron_expr).await?;
        }
        Ok(())
    }

    async fn fire(&self, repository_id: Uuid) {
        let repo = match db::repository::sync_entities::get_git_repository(&self.pool, repository_id).await {
            Ok(repo) => repo,
            Err(err) => {
                error!(repository_id = %repository_id, error = %err, "failed to reload git repository on sync fire");
                return;
            }
        };
        if !repo.sync_enabled {
            return;
        }
        self.notifier.publish(SyncNotification {
            channel: format!("git:sync:{repository_id}"),
            action: "sync".to_string(),
            repository_id,
            tenant_id: repo.tenant_id,
            operator_id: None,
            timestamp: Utc::now(),
        });
    }
}

/// Owns the `ticket_plugins` sync timer.
pub struct TicketSyncScheduler {
    pool: DbPool,
    cron: Arc<CronCore>,
    notifier: SyncNotifier,
    handles: Mutex<HashMap<Uuid, JobHandle>>,
}

impl TicketSyncScheduler {
    pub fn new(pool: DbPool, cron: Arc<CronCore>, notifier: SyncNotifier) -> Arc<Self> {
        Arc::new(Self { pool, cron, notifier, handles: Mutex::new(HashMap::new()) })
    }

    pub async fn start(self: &Arc<Self>) -> Result<(), QueueError> {
        let plugins = db::repository::sync_entities::list_active_ticket_plugins(&self.pool).await?;
        for plugin in plugins {
            let Some(cron_expr) = plugin.sync_cron.clone() else { continue };
            if let Err(err) = self.register(plugin.id, &cron_expr).await {
                error!(ticket_plugin_id = %plugin.id, error = %err, "failed to register ticket sync at startup");
            }
        }
        Ok(())
    }

    async fn register(self: &Arc<Self>, ticket_plugin_id: Uuid, cron_expr: &str) -> Result<(), QueueError> {
        let this = Arc::clone(self);
        let handle = self.cron.add(cron_expr, move || {
            let this = Arc::clone(&this);
            async move {
                this.fire(ticket_plugin_id).await;
            }
        })?;

        self.handles.lock().insert(ticket_plugin_id, handle);
        let next_fire_at = self.cron.next_fire_at(handle);
        db::repository::sync_entities::set_ticket_plugin_next_run_at(&self.pool, ticket_plugin_id, next_fire_at)
            .await?;
        Ok(())
    }

    pub fn remove(&self, ticket_plugin_id: Uuid) {
        if let Some(handle) = self.handles.lock().remove(&ticket_plugin_id) {
            self.cron.remove(handle);
        }
    }

    pub async fn refresh(self: &Arc<Self>, ticket_plugin_id: Uuid) -> Result<(), QueueError> {
        self.remove(ticket_plugin_id);
        let plugin = db::repository::sync_entities::get_ticket_plugin(&self.pool, ticket_plugin_id).await?;
        if let Some(cron_expr) = plugin.sync_cron.filter(|_| plugin.sync_enabled) {
            self.register(ticket_plugin_id, &cron_expr).await?;
        }
        Ok(())
    }

    async fn fire(&self, ticket_plugin_id: Uuid) {
        let plugin = match db::repository::sync_entities::get_ticket_plugin(&self.pool, ticket_plugin_id).await {
            Ok(plugin) => plugin,
            Err(err) => {
                error!(ticket_plugin_id = %ticket_plugin_id, error = %err, "failed to reload ticket plugin on sync fire");
                return;
            }
        };
        if !plugin.sync_enabled {
            return;
        }
        self.notifier.publish(SyncNotification {
            channel: format!("ticket:sync:{ticket_plugin_id}"),
            action: "sync".to_string(),
            repository_id: ticket_plugin_id,
            tenant_id: plugin.tenant_id,
            operator_id: None,
            timestamp: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn notifier_delivers_to_subscriber() {
        let notifier = SyncNotifier::new();
        let mut rx = notifier.subscribe();
        notifier.publish(SyncNotification {
            channel: "git:sync:abc".to_string(),
            action: "sync".to_string(),
            repository_id: Uuid::nil(),
            tenant_id: Uuid::nil(),
            operator_id: None,
            timestamp: Utc::now(),
        });
        let received = rx.recv().await.unwrap();
        assert_eq!(received.channel, "git:sync:abc");
    }

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let notifier = SyncNotifier::new();
        notifier.publish(SyncNotification {
            channel: "git:sync:xyz".to_string(),
            action: "delete".to_string(),
            repository_id: Uuid::nil(),
            tenant_id: Uuid::nil(),
            operator_id: None,
            timestamp: Utc::now(),
        });
    }
}
