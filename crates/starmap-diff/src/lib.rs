//! Field-path access and diffing for Starmap catalog records.
//!
//! Every record type exposes a static table of typed getter/setter pairs keyed
//! by [`FieldPath`](starmap_types::FieldPath), so the merge engine can read and
//! write arbitrary nested fields by path without runtime reflection. Values
//! cross the table as `serde_json::Value`.
//!
//! # Key Types
//!
//! - [`Record`]: Implemented by `Model`, `Provider`, and `Author`
//! - [`FieldSpec`]: One table row (path, merge policy, getter, setter)
//! - [`RecordDiff`] / [`FieldChange`]: Field-level diff between two records

pub mod access;
pub mod compare;
pub mod error;
pub mod record_diff;
mod tables;

pub use access::{get_path, set_path, FieldSpec, ParentSpec, Record};
pub use compare::{is_absent, numeric_max, set_union, values_equal};
pub use error::{DiffResult, FieldError};
pub use record_diff::{diff_records, FieldChange, RecordDiff};
