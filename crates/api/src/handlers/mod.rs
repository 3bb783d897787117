pub mod executions;
pub mod schedulers;
pub mod webhooks;
pub mod workflows;
