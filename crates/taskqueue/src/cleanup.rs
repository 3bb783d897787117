//! Zombie/stuck task reconciliation sweep (spec §4.9), run on a periodic
//! interval (every 5 minutes) by the caller wiring this crate together.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use db::DbPool;
use tracing::info;

use crate::error::QueueError;
use crate::queue::{QueueStatus, TaskQueue};

const PENDING_TIMEOUT_MINUTES: i64 = 30;
const QUEUED_TIMEOUT_MINUTES: i64 = 5;
const RUNNING_TIMEOUT_MINUTES: i64 = 30;

/// Counts of what one sweep reconciled, for logging/observability.
#[derive(Debug, Default)]
pub struct CleanupReport {
    pub pending_timed_out: usize,
    pub lost_in_queue: usize,
    pub execution_timed_out: usize,
    pub scheduled_tasks_reconciled: usize,
}

/// Reconciles tasks and scheduled tasks that have been stuck past their
/// expected transition window (spec §4.9).
pub struct CleanupSweeper {
    pool: DbPool,
    queue: Arc<TaskQueue>,
}

impl CleanupSweeper {
    pub fn new(pool: DbPool, queue: Arc<TaskQueue>) -> Self {
        Self { pool, queue }
    }

    pub async fn sweep(&self) -> Result<CleanupReport, QueueError> {
        let mut report = CleanupReport::default();
        let now = Utc::now();

        let pending_cutoff = now - ChronoDuration::minutes(PENDING_TIMEOUT_MINUTES);
        for task in db::repository::tasks::list_pending_older_than(&self.pool, pending_cutoff).await? {
            self.fail(&task.task_id, "not enqueued in time").await?;
            report.pending_timed_out += 1;
        }

        let queued_cutoff = now - ChronoDuration::minutes(QUEUED_TIMEOUT_MINUTES);
        for task in db::repository::tasks::list_queued_older_than(&self.pool, queued_cutoff).await? {
            if !self.queue.contains(&task.task_id) {
                self.fail(&task.task_id, "lost in queue").await?;
                report.lost_in_queue += 1;
            }
        }

        let running_cutoff = now - ChronoDuration::minutes(RUNNING_TIMEOUT_MINUTES);
        for task in db::repository::tasks::list_running_older_than(&self.pool, running_cutoff).await? {
            let queue_confirms_running =
                self.queue.get_status(&task.task_id).map(|s| s.status == "running").unwrap_or(false);
            if queue_confirms_running {
                self.fail(&task.task_id, "execution timeout").await?;
                self.queue.remove(&task.task_id);
                report.execution_timed_out += 1;
            }
        }

        let stuck_cutoff = now - ChronoDuration::minutes(RUNNING_TIMEOUT_MINUTES);
        for scheduled in db::repository::scheduled_tasks::list_stuck_running(&self.pool, stuck_cutoff).await? {
            let reconciled_status = match &scheduled.last_task_id {
                Some(task_id) => match db::repository::tasks::get_task(&self.pool, task_id).await {
                    Ok(task) if is_terminal(&task.status) => task.status,
                    _ => "failed".to_string(),
                },
                None => "failed".to_string(),
            };
            db::repository::scheduled_tasks::finish_run(&self.pool, scheduled.id, &reconciled_status).await?;
            report.scheduled_tasks_reconciled += 1;
        }

        let total = report.pending_timed_out
            + report.lost_in_queue
            + report.execution_timed_out
            + report.scheduled_tasks_reconciled;
        if total > 0 {
            info!(
                pending_timed_out = report.pending_timed_out,
                lost_in_queue = report.lost_in_queue,
                execution_timed_out = report.execution_timed_out,
                scheduled_tasks_reconciled = report.scheduled_tasks_reconciled,
                "cleanup sweep reconciled stuck work",
            );
        }

        Ok(report)
    }

    async fn fail(&self, task_id: &str, message: &str) -> Result<(), QueueError> {
        db::repository::tasks::set_result(&self.pool, task_id, None, Some(message)).await?;
        self.queue.set_status(
            task_id,
            QueueStatus { status: "failed".to_string(), progress: 100, result: None, error: Some(message.to_string()) },
        );
        Ok(())
    }
}

fn is_terminal(status: &str) -> bool {
    matches!(status, "success" | "failed" | "cancelled" | "timeout")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_terminal_recognizes_every_terminal_status() {
        assert!(is_terminal("success"));
        assert!(is_terminal("failed"));
        assert!(is_terminal("cancelled"));
        assert!(is_terminal("timeout"));
        assert!(!is_terminal("running"));
        assert!(!is_terminal("queued"));
    }

    #[test]
    fn report_defaults_to_zero() {
        let report = CleanupReport::default();
        assert_eq!(report.pending_timed_out, 0);
        assert_eq!(report.scheduled_tasks_reconciled, 0);
    }
}
