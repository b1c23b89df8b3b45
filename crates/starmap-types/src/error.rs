use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("unknown source name: {0}")]
    UnknownSource(String),

    #[error("unknown resource type: {0}")]
    UnknownResourceType(String),

    #[error("unknown merge policy: {0}")]
    UnknownPolicy(String),

    #[error("invalid field path: {0:?}")]
    InvalidFieldPath(String),
}
