//! Database-backed [`nodes::traits::HostLookup`] (spec §4.7 `task_execute`).

use async_trait::async_trait;
use db::DbPool;
use nodes::traits::{HostLookup, HostRef};
use nodes::NodeError;
use uuid::Uuid;

pub struct DbHostLookup {
    pool: DbPool,
}

impl DbHostLookup {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HostLookup for DbHostLookup {
    async fn find_by_ip(&self, tenant_id: Uuid, ip: &str) -> Result<Option<HostRef>, NodeError> {
        let row = db::repository::inventory::find_host_by_ip(&self.pool, tenant_id, ip)
            .await
            .map_err(|e| NodeError::new(e.to_string()))?;
        Ok(row.map(|h| HostRef { id: h.id, identifier: ip.to_string() }))
    }

    async fn find_by_hostname(&self, tenant_id: Uuid, hostname: &str) -> Result<Option<HostRef>, NodeError> {
        let row = db::repository::inventory::find_host_by_hostname(&self.pool, tenant_id, hostname)
            .await
            .map_err(|e| NodeError::new(e.to_string()))?;
        Ok(row.map(|h| HostRef { id: h.id, identifier: hostname.to_string() }))
    }
}
