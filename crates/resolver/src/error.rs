//! Resolver error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("unknown transform function: '{0}'")]
    UnknownTransform(String),

    #[error("transform '{name}' failed: {message}")]
    TransformFailed { name: String, message: String },

    #[error("malformed transform spec: {0}")]
    MalformedSpec(String),
}
