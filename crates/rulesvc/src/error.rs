//! `rulesvc` error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleSvcError {
    #[error("database error: {0}")]
    Database(#[from] db::DbError),

    #[error("match condition error: {0}")]
    Match(#[from] match_engine::MatchError),

    #[error("engine error: {0}")]
    Engine(#[from] engine::EngineError),

    #[error("cron error: {0}")]
    Cron(#[from] cron_core::error::CronError),

    #[error("rule '{0}' not found in registry")]
    UnknownRule(uuid::Uuid),
}
