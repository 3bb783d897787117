//! `cron_core` — the reusable cron firing engine shared by the four
//! higher-level schedulers, plus the registry that holds them (spec §4.1).

pub mod core;
pub mod error;
pub mod parser;
pub mod registry;

pub use core::{CronCore, EntrySnapshot, JobHandle};
pub use error::CronError;
pub use registry::{SchedulerRegistry, SchedulerStatus};
