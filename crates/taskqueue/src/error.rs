//! `taskqueue` error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("database error: {0}")]
    Database(#[from] db::DbError),

    #[error("task not found in queue: {0}")]
    NotQueued(String),

    #[error("template not found or inactive")]
    TemplateUnavailable,

    #[error("host '{0}' not found for this tenant")]
    HostNotFound(String),

    #[error("variable validation failed: {0}")]
    InvalidVariables(String),

    #[error("worker '{0}' already connected with a live heartbeat")]
    WorkerAlreadyConnected(String),

    #[error("task '{0}' is already terminal")]
    AlreadyTerminal(String),

    #[error("cron error: {0}")]
    Cron(#[from] cron_core::CronError),
}

impl From<QueueError> for nodes::NodeError {
    fn from(e: QueueError) -> Self {
        nodes::NodeError::new(e.to_string())
    }
}
