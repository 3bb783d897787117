//! The reusable cron firing engine (spec §4.1).
//!
//! A single `CronCore` instance owns a monotonic tick loop and dispatches
//! due callbacks onto the tokio runtime. Each of the four higher-level
//! schedulers (rule, scheduled-task, Git-sync, ticket-sync) wraps its own
//! independent instance — see `CronCore::new` at each call site.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cron::Schedule;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, warn};
use uuid::Uuid;

use crate::error::CronError;
use crate::parser;

/// Opaque handle returned by [`CronCore::add`].
pub type JobHandle = Uuid;

type JobFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A registered callback. Closures capture only the job id — the higher
/// level scheduler reloads the underlying entity from the database before
/// acting on it (spec §4.1 "Firing model").
pub type JobFn = Arc<dyn Fn() -> JobFuture + Send + Sync>;

struct Entry {
    schedule: Schedule,
    job: JobFn,
    next_fire_at: Option<DateTime<Utc>>,
    prev_fire_at: Option<DateTime<Utc>>,
}

/// One entry snapshot as returned by [`CronCore::entries`].
#[derive(Debug, Clone)]
pub struct EntrySnapshot {
    pub handle: JobHandle,
    pub next_fire_at: Option<DateTime<Utc>>,
    pub prev_fire_at: Option<DateTime<Utc>>,
}

/// The cron firing engine shared by every named scheduler.
pub struct CronCore {
    entries: Arc<Mutex<HashMap<JobHandle, Entry>>>,
    running: Arc<AtomicBool>,
    tick: Duration,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
    name: String,
}

impl CronCore {
    /// Create a new core. `name` identifies it in logs (e.g. `"rule"`,
    /// `"scheduled_task"`).
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Self::with_tick(name, Duration::from_secs(1))
    }

    /// Create a new core with a custom tick granularity (mainly for tests).
    pub fn with_tick(name: impl Into<String>, tick: Duration) -> Arc<Self> {
        Arc::new(Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            running: Arc::new(AtomicBool::new(false)),
            tick,
            loop_handle: Mutex::new(None),
            name: name.into(),
        })
    }

    /// Register a callback under `cron_expr`. See `cron_core::parser` for
    /// the accepted dialects.
    pub fn add<F, Fut>(&self, cron_expr: &str, job: F) -> Result<JobHandle, CronError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let schedule = parser::parse(cron_expr)?;
        let next_fire_at = schedule.upcoming(Utc).next();
        let handle = Uuid::new_v4();

        let boxed: JobFn = Arc::new(move || Box::pin(job()) as JobFuture);

        self.entries.lock().insert(
            handle,
            Entry { schedule, job: boxed, next_fire_at, prev_fire_at: None },
        );

        Ok(handle)
    }

    /// Remove a registered handle. Idempotent — removing an unknown or
    /// already-removed handle is not an error.
    pub fn remove(&self, handle: JobHandle) {
        self.entries.lock().remove(&handle);
    }

    /// Observability/persistence surface: every registered handle's next
    /// and previous fire time.
    pub fn entries(&self) -> Vec<EntrySnapshot> {
        self.entries
            .lock()
            .iter()
            .map(|(handle, entry)| EntrySnapshot {
                handle: *handle,
                next_fire_at: entry.next_fire_at,
                prev_fire_at: entry.prev_fire_at,
            })
            .collect()
    }

    pub fn next_fire_at(&self, handle: JobHandle) -> Option<DateTime<Utc>> {
        self.entries.lock().get(&handle).and_then(|e| e.next_fire_at)
    }

    /// Begin firing on the monotonic tick. Safe to call once; subsequent
    /// calls while already running are a no-op.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(this.tick);
            loop {
                interval.tick().await;
                if !this.running.load(Ordering::SeqCst) {
                    break;
                }
                this.fire_due();
            }
        });

        *self.loop_handle.lock() = Some(handle);
    }

    /// Halt further fires. Does not recall already-spawned callbacks
    /// (those run to completion independently); it only stops the tick
    /// loop from scheduling new ones.
    pub async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        let handle = self.loop_handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    fn fire_due(&self) {
        let now = Utc::now();
        let due: Vec<(JobHandle, JobFn)> = {
            let mut entries = self.entries.lock();
            let mut due = Vec::new();
            for (handle, entry) in entries.iter_mut() {
                if entry.next_fire_at.map(|t| t <= now).unwrap_or(false) {
                    due.push((*handle, Arc::clone(&entry.job)));
                    entry.prev_fire_at = Some(now);
                    entry.next_fire_at = entry.schedule.after(&now).next();
                }
            }
            due
        };

        for (handle, job) in due {
            let scheduler_name = self.name.clone();
            let fut = job();
            // A panicking callback must not crash the scheduler (spec §4.1) —
            // tokio::spawn already isolates the panic to this task; we just
            // log it instead of letting the JoinHandle drop silently.
            let task = tokio::spawn(fut);
            tokio::spawn(async move {
                if let Err(join_err) = task.await {
                    if join_err.is_panic() {
                        error!(scheduler = %scheduler_name, %handle, "cron job panicked");
                    } else {
                        warn!(scheduler = %scheduler_name, %handle, "cron job cancelled");
                    }
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration as StdDuration;

    #[tokio::test]
    async fn fires_registered_job_on_tick() {
        let core = CronCore::with_tick("test", StdDuration::from_millis(10));
        let counter = Arc::new(AtomicU32::new(0));

        let c = Arc::clone(&counter);
        core.add("* * * * * *", move || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        })
        .unwrap();

        core.start();
        tokio::time::sleep(StdDuration::from_millis(100)).await;
        core.stop().await;

        assert!(counter.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn remove_is_idempotent() {
        let core = CronCore::new("test");
        let handle = Uuid::new_v4();
        core.remove(handle);
        core.remove(handle);
    }

    #[test]
    fn entries_reports_registered_handle() {
        let core = CronCore::new("test");
        let handle = core.add("@hourly", || async {}).unwrap();
        let entries = core.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].handle, handle);
        assert!(entries[0].next_fire_at.is_some());
    }
}
