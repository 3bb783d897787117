//! `rulesvc` — the rule scheduler (spec §4.2): evaluates remediation rules
//! on a cron schedule (or on demand) and dispatches matching workflow
//! executions through the `engine` crate.

pub mod error;
pub mod scheduler;

pub use error::RuleSvcError;
pub use scheduler::{RuleScheduler, RuleSchedulerConfig};
