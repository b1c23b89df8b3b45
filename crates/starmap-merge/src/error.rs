//! Error types for the merge crate.

use std::path::PathBuf;

use starmap_types::{MergeMode, ResourceType, SourceName, TypeError};

/// Structural failures of a merge call or a rule set.
///
/// Field-level problems are never reported here: they are logged and the
/// offending value is treated as absent. Conflicts are output, not errors.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// base / ours / theirs are not the same kind of record.
    #[error("resource type mismatch: base is {base}, {side} is {actual}")]
    ResourceTypeMismatch {
        base: ResourceType,
        side: SourceName,
        actual: ResourceType,
    },

    /// base / ours / theirs do not describe the same record.
    #[error("{side} record {actual:?} does not match base record {base:?}")]
    IdMismatch {
        side: SourceName,
        base: String,
        actual: String,
    },

    /// A source was supplied to a merge mode it does not belong to.
    #[error("source {name} cannot take part in a {mode} merge")]
    InvalidSource { name: SourceName, mode: MergeMode },

    /// A rule names a path that is not a field (or field prefix) of the
    /// resource type.
    #[error("unknown field {path:?} on {resource}")]
    UnknownField { resource: ResourceType, path: String },

    /// A priority list mixes catalog sources with three-way sides.
    #[error("priority list for {field:?} mixes merge modes")]
    MixedPriority { field: String },

    #[error("unknown conflict resolution: {0:?}")]
    UnknownResolution(String),

    #[error("invalid rule: {0}")]
    InvalidRule(#[from] TypeError),

    #[error("failed to read rules from {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse rules: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Convenience alias for merge results.
pub type MergeResult<T> = Result<T, MergeError>;
