//! Stand-ins for the collaborators the orchestration core treats as
//! external (spec §1 non-goals: ticket write-back target and credential
//! envelope decryption). Wiring a real ticket system or secrets vault
//! behind [`nodes::traits::TicketWriter`]/[`nodes::traits::CredentialService`]
//! is a deployment concern, not this crate's.

use async_trait::async_trait;
use nodes::traits::{CredentialService, TicketWriter};
use nodes::NodeError;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

pub struct UnconfiguredTicketWriter;

#[async_trait]
impl TicketWriter for UnconfiguredTicketWriter {
    async fn update(&self, tenant_id: Uuid, ticket_id: Value, _updates: Value) -> Result<(), NodeError> {
        warn!(%tenant_id, ?ticket_id, "no ticket writer configured, dropping ticket_update");
        Err(NodeError::new("ticket writer not configured"))
    }
}

pub struct UnconfiguredCredentialService;

#[async_trait]
impl CredentialService for UnconfiguredCredentialService {
    async fn decrypt(&self, credential_id: Uuid, tenant_id: Uuid) -> Result<Value, NodeError> {
        warn!(%credential_id, %tenant_id, "no credential service configured");
        Err(NodeError::new("credential service not configured"))
    }
}
