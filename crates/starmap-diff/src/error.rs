//! Error types for the diff crate.

use starmap_types::ResourceType;

/// Errors that can occur while reading or writing fields by path.
#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    /// The path is not in the record type's field table.
    #[error("unknown field {path:?} on {resource}")]
    UnknownField {
        resource: ResourceType,
        path: String,
    },

    /// The value does not have the shape the field expects.
    #[error("cannot decode value for {path:?}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience alias for field access results.
pub type DiffResult<T> = Result<T, FieldError>;
