//! Cron core error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CronError {
    /// Returned on `add()` when the expression does not parse.
    ///
    /// Carries the field count the caller supplied so the message can
    /// point out the mismatch (spec §6: "fail on create/update with a
    /// parse-error message pointing out the field count").
    #[error("invalid cron expression '{expr}' ({field_count} fields): {reason}")]
    InvalidExpression {
        expr: String,
        field_count: usize,
        reason: String,
    },

    #[error("no handle registered: {0}")]
    UnknownHandle(uuid::Uuid),
}
