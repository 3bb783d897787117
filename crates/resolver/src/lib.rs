//! `resolver` — the JSONPath-like extractor, `{{path}}` variable resolver,
//! and transform library used inside workflow nodes (spec §4.5).
//!
//! No node-kind semantics live here; `nodes::data_process` and
//! `nodes::task_execute` are the callers.

pub mod error;
pub mod jsonpath;
pub mod resolve;
pub mod transform;

pub use error::ResolverError;
pub use jsonpath::extract;
pub use resolve::{resolve, resolve_string, resolve_tree};
pub use transform::Transform;
