//! `taskqueue` — task dispatch, the worker registry, the scheduled-task and
//! sync schedulers, and the stuck-task cleanup sweep (spec §4.8, §4.9).

pub mod cleanup;
pub mod client;
pub mod error;
pub mod hosts;
pub mod queue;
pub mod scheduled;
pub mod service;
pub mod sync;
pub mod workers;

pub use cleanup::{CleanupReport, CleanupSweeper};
pub use client::QueueTaskClient;
pub use error::QueueError;
pub use hosts::DbHostLookup;
pub use queue::{QueueEntry, QueueStatus, TaskQueue};
pub use scheduled::ScheduledTaskRunner;
pub use service::{CreateTaskParams, ParamSpec, TaskService};
pub use sync::{GitSyncScheduler, SyncNotification, SyncNotifier, TicketSyncScheduler};
pub use workers::WorkerRegistry;
