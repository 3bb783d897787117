//! The priority queue / pub-sub bridge to remote workers (spec §4.8).
//!
//! The database is the source of truth; this queue mirrors the in-flight
//! subset (spec §5 "Shared resources"). It is an in-process structure —
//! the worker-side wire protocol that actually drains it is out of scope
//! (spec §1 "on-worker script execution itself").

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use uuid::Uuid;

/// One enqueued unit of work, as published by [`crate::service::TaskService`]
/// (spec §4.8's `enqueue(...)` tuple).
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub task_id: String,
    pub task_type: String,
    pub tenant_id: Uuid,
    pub tenant_name: String,
    pub created_by: Option<Uuid>,
    pub username: String,
    pub source: String,
    pub priority: i32,
    pub params: Value,
    pub enqueued_at: DateTime<Utc>,
    sequence: u64,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}
impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// `BinaryHeap` is a max-heap; priority 1 is highest (spec §3 "lower=higher"),
/// so we invert the comparison and break ties by earliest-enqueued-first.
impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Mirrors a task's last known status/progress — read by the node executor
/// poll loop and by the cleanup sweep's "still running per the queue" check
/// (spec §4.9).
#[derive(Debug, Clone)]
pub struct QueueStatus {
    pub status: String,
    pub progress: i32,
    pub result: Option<Value>,
    pub error: Option<String>,
}

#[derive(Default)]
struct Inner {
    heap: BinaryHeap<QueueEntry>,
    /// Every task id currently considered "in the queue" — popped entries
    /// are removed from here too, so a zombie check can ask "is this task
    /// still queue-resident" without draining the heap.
    present: HashMap<String, ()>,
    statuses: HashMap<String, QueueStatus>,
    next_sequence: u64,
}

/// The shared priority queue. Cheap to clone (wraps an `Arc` internally via
/// the caller holding it behind one); construct one instance per process
/// and share it between the task service, the node executors' `TaskClient`,
/// and the cleanup sweep.
pub struct TaskQueue {
    inner: Mutex<Inner>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self { inner: Mutex::new(Inner::default()) }
    }

    pub fn enqueue(&self, mut entry: QueueEntry) {
        let mut inner = self.inner.lock();
        entry.sequence = inner.next_sequence;
        inner.next_sequence += 1;
        inner.present.insert(entry.task_id.clone(), ());
        inner.statuses.insert(
            entry.task_id.clone(),
            QueueStatus { status: "queued".to_string(), progress: 0, result: None, error: None },
        );
        inner.heap.push(entry);
    }

    /// Pop the highest-priority (lowest number), earliest-enqueued entry.
    /// Used by a worker-facing dequeue surface; not exercised by the node
    /// executor, which only publishes and polls status.
    pub fn pop_next(&self) -> Option<QueueEntry> {
        let mut inner = self.inner.lock();
        let entry = inner.heap.pop()?;
        inner.present.remove(&entry.task_id);
        Some(entry)
    }

    /// Whether the queue still considers `task_id` in flight (queued or
    /// otherwise not yet finalized) — spec §4.9 "the queue no longer
    /// contains it".
    pub fn contains(&self, task_id: &str) -> bool {
        let inner = self.inner.lock();
        inner.present.contains_key(task_id)
            || inner
                .statuses
                .get(task_id)
                .map(|s| !matches!(s.status.as_str(), "success" | "failed" | "cancelled" | "timeout"))
                .unwrap_or(false)
    }

    pub fn set_status(&self, task_id: &str, status: QueueStatus) {
        let mut inner = self.inner.lock();
        if status.status != "queued" {
            inner.present.remove(task_id);
        }
        inner.statuses.insert(task_id.to_string(), status);
    }

    pub fn get_status(&self, task_id: &str) -> Option<QueueStatus> {
        self.inner.lock().statuses.get(task_id).cloned()
    }

    /// Drop a task entirely — used when enqueue fails right after task
    /// creation (spec §4.8 "enqueue failure deletes the task row") and by
    /// the cleanup sweep when it force-removes a stuck task.
    pub fn remove(&self, task_id: &str) {
        let mut inner = self.inner.lock();
        inner.present.remove(task_id);
        inner.statuses.remove(task_id);
    }

    pub fn depth(&self) -> usize {
        self.inner.lock().heap.len()
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(task_id: &str, priority: i32) -> QueueEntry {
        QueueEntry {
            task_id: task_id.to_string(),
            task_type: "template".to_string(),
            tenant_id: Uuid::nil(),
            tenant_name: "acme".to_string(),
            created_by: None,
            username: "system".to_string(),
            source: "workflow".to_string(),
            priority,
            params: Value::Null,
            enqueued_at: Utc::now(),
            sequence: 0,
        }
    }

    #[test]
    fn pops_lowest_priority_number_first() {
        let q = TaskQueue::new();
        q.enqueue(entry("low-prio", 8));
        q.enqueue(entry("high-prio", 1));
        q.enqueue(entry("mid-prio", 5));

        assert_eq!(q.pop_next().unwrap().task_id, "high-prio");
        assert_eq!(q.pop_next().unwrap().task_id, "mid-prio");
        assert_eq!(q.pop_next().unwrap().task_id, "low-prio");
    }

    #[test]
    fn ties_break_fifo() {
        let q = TaskQueue::new();
        q.enqueue(entry("first", 5));
        q.enqueue(entry("second", 5));
        assert_eq!(q.pop_next().unwrap().task_id, "first");
        assert_eq!(q.pop_next().unwrap().task_id, "second");
    }

    #[test]
    fn contains_reflects_presence_until_finalized() {
        let q = TaskQueue::new();
        q.enqueue(entry("t1", 5));
        assert!(q.contains("t1"));
        q.set_status("t1", QueueStatus { status: "running".to_string(), progress: 10, result: None, error: None });
        assert!(q.contains("t1"));
        q.set_status("t1", QueueStatus { status: "success".to_string(), progress: 100, result: None, error: None });
        assert!(!q.contains("t1"));
    }
}
