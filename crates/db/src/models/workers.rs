//! `worker_connections` row struct.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An ephemeral worker-connection fact.
///
/// At most one `active` row exists per `worker_id` — enforced in Postgres
/// by a partial unique index (`migrations/0001_initial.sql`) and, at the
/// application level, by `taskqueue::workers::register`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkerConnectionRow {
    pub id: Uuid,
    pub worker_id: String,
    pub ip: String,
    pub status: String,
    pub connected_at: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
    pub access_key: String,
}
