//! Worker registry and heartbeat reconciliation (spec §4.9).

use chrono::{Duration as ChronoDuration, Utc};
use db::models::WorkerConnectionRow;
use db::DbPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::QueueError;

/// A connection is considered fresh for this long; past it, the sweeper
/// (and a conflicting registration) treats it as abandoned (spec §3, §4.9).
const HEARTBEAT_TIMEOUT_SECONDS: i64 = 60;

pub struct WorkerRegistry {
    pool: DbPool,
}

impl WorkerRegistry {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Register a worker connection (spec §4.9): within one transaction,
    /// reject a still-live prior connection, or reclaim the slot from a
    /// stale one.
    pub async fn register(
        &self,
        worker_id: &str,
        ip: &str,
        access_key: &str,
    ) -> Result<WorkerConnectionRow, QueueError> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as!(
            WorkerConnectionRow,
            r#"
            SELECT id, worker_id, ip, status, connected_at, last_heartbeat, access_key
            FROM worker_connections WHERE worker_id = $1 AND status = 'active'
            FOR UPDATE
            "#,
            worker_id,
        )
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(row) = existing {
            let age = Utc::now() - row.last_heartbeat;
            if age < ChronoDuration::seconds(HEARTBEAT_TIMEOUT_SECONDS) {
                return Err(QueueError::WorkerAlreadyConnected(worker_id.to_string()));
            }
            sqlx::query!("UPDATE worker_connections SET status = 'disconnected' WHERE id = $1", row.id)
                .execute(&mut *tx)
                .await?;
            info!(worker_id, "reclaimed stale worker connection slot");
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        let row = sqlx::query_as!(
            WorkerConnectionRow,
            r#"
            INSERT INTO worker_connections (id, worker_id, ip, status, connected_at, last_heartbeat, access_key)
            VALUES ($1, $2, $3, 'active', $4, $4, $5)
            RETURNING id, worker_id, ip, status, connected_at, last_heartbeat, access_key
            "#,
            id,
            worker_id,
            ip,
            now,
            access_key,
        )
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(worker_id, ip, "worker connection registered");
        Ok(row)
    }

    pub async fn heartbeat(&self, worker_id: &str) -> Result<(), QueueError> {
        db::repository::workers::heartbeat(&self.pool, worker_id).await?;
        Ok(())
    }

    /// Mark connections whose heartbeat is past the timeout as
    /// `disconnected` (spec §4.9 "a sweeper marks connections stale").
    pub async fn sweep_stale(&self) -> Result<usize, QueueError> {
        let cutoff = Utc::now() - ChronoDuration::seconds(HEARTBEAT_TIMEOUT_SECONDS);
        let stale = db::repository::workers::list_stale(&self.pool, cutoff).await?;
        for row in &stale {
            if let Err(e) = db::repository::workers::mark_disconnected(&self.pool, row.id).await {
                warn!(worker_id = %row.worker_id, error = %e, "failed to mark stale worker disconnected");
            }
        }
        Ok(stale.len())
    }
}
