//! Match engine error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("source cannot be inferred")]
    SourceNotInferable,

    #[error("unsupported inventory source: '{0}' (only 'ticket' is supported)")]
    UnsupportedSource(String),

    #[error("leaf condition missing 'field' or 'operator'")]
    IncompleteLeaf,

    #[error("unknown operator: '{0}'")]
    UnknownOperator(String),

    #[error("malformed match condition JSON: {0}")]
    Malformed(String),
}
