//! The scheduler registry (spec §4.1 "Scheduler Registry", §9 design note
//! "inject a registry object constructed at program start").
//!
//! Holds the four named cron cores — `rule`, `scheduled_task`, `git_sync`,
//! `ticket_sync` — and exposes a unified status surface for observability,
//! rather than scattering process-wide singletons across the codebase.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::core::CronCore;

/// Per-scheduler status, as surfaced by `GET /api/v1/schedulers` and the
/// `cli scheduler-status` subcommand (SPEC_FULL.md supplemented feature).
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub name: String,
    pub job_count: usize,
    pub next_fire_at: Option<chrono::DateTime<chrono::Utc>>,
    pub prev_fire_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Holds one [`CronCore`] per named scheduler.
pub struct SchedulerRegistry {
    schedulers: HashMap<String, Arc<CronCore>>,
}

impl SchedulerRegistry {
    pub fn new() -> Self {
        Self { schedulers: HashMap::new() }
    }

    /// Register a named scheduler's core. Called once at program start for
    /// each of the four: `rule`, `scheduled_task`, `git_sync`, `ticket_sync`.
    pub fn register(&mut self, name: impl Into<String>, core: Arc<CronCore>) {
        self.schedulers.insert(name.into(), core);
    }

    pub fn get(&self, name: &str) -> Option<Arc<CronCore>> {
        self.schedulers.get(name).cloned()
    }

    /// Start every registered scheduler's tick loop.
    pub fn start_all(&self) {
        for core in self.schedulers.values() {
            core.start();
        }
    }

    /// Stop every registered scheduler's tick loop, awaiting each in turn.
    pub async fn stop_all(&self) {
        for core in self.schedulers.values() {
            core.stop().await;
        }
    }

    /// A status summary across every named scheduler, sorted by name for
    /// stable output.
    pub fn status(&self) -> Vec<SchedulerStatus> {
        let mut names: Vec<&String> = self.schedulers.keys().collect();
        names.sort();

        names
            .into_iter()
            .map(|name| {
                let core = &self.schedulers[name];
                let entries = core.entries();
                let next_fire_at = entries.iter().filter_map(|e| e.next_fire_at).min();
                let prev_fire_at = entries.iter().filter_map(|e| e.prev_fire_at).max();
                SchedulerStatus {
                    name: name.clone(),
                    job_count: entries.len(),
                    next_fire_at,
                    prev_fire_at,
                }
            })
            .collect()
    }
}

impl Default for SchedulerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_lists_every_registered_scheduler() {
        let mut registry = SchedulerRegistry::new();
        registry.register("rule", CronCore::new("rule"));
        registry.register("scheduled_task", CronCore::new("scheduled_task"));

        let status = registry.status();
        assert_eq!(status.len(), 2);
        assert_eq!(status[0].name, "rule");
        assert_eq!(status[1].name, "scheduled_task");
    }
}
