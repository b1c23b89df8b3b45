//! Field-level diff between two versions of a record.
//!
//! Every path in the record type's field table is compared under its merge
//! policy. A field going from absent (see [`is_absent`]) to a value is
//! `Added`, the reverse is `Removed`, any other difference is `Modified`.

use serde::Serialize;
use serde_json::Value;

use starmap_types::FieldPath;

use crate::access::Record;
use crate::compare::{is_absent, values_equal};

/// The result of comparing two records.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RecordDiff {
    /// Changes in field-table order.
    pub changes: Vec<FieldChange>,
}

impl RecordDiff {
    /// Create an empty record diff.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if there are no changes.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of changes.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Returns `true` if the field at `path` changed.
    pub fn touches(&self, path: &str) -> bool {
        self.changes.iter().any(|c| c.path() == path)
    }

    /// Paths of all changed fields.
    pub fn paths(&self) -> impl Iterator<Item = &FieldPath> {
        self.changes.iter().map(FieldChange::path)
    }

    /// Number of added fields.
    pub fn additions(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, FieldChange::Added { .. }))
            .count()
    }

    /// Number of removed fields.
    pub fn removals(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, FieldChange::Removed { .. }))
            .count()
    }

    /// Number of modified fields.
    pub fn modifications(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, FieldChange::Modified { .. }))
            .count()
    }
}

/// A single field change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum FieldChange {
    /// The field went from absent to a value.
    Added { path: FieldPath, value: Value },
    /// The field went from a value to absent.
    Removed { path: FieldPath, value: Value },
    /// The field's value changed.
    Modified {
        path: FieldPath,
        old: Value,
        new: Value,
    },
}

impl FieldChange {
    pub fn path(&self) -> &FieldPath {
        match self {
            Self::Added { path, .. } | Self::Removed { path, .. } | Self::Modified { path, .. } => {
                path
            }
        }
    }
}

/// Compute the diff from `old` to `new`.
pub fn diff_records<R: Record>(old: &R, new: &R) -> RecordDiff {
    let mut changes = Vec::new();

    for spec in R::fields() {
        let old_val = spec.get(old);
        let new_val = spec.get(new);
        if values_equal(spec.policy(), &old_val, &new_val) {
            continue;
        }

        let path = spec.field_path();
        let change = match (is_absent(&old_val), is_absent(&new_val)) {
            (true, true) => continue,
            (true, false) => FieldChange::Added { path, value: new_val },
            (false, true) => FieldChange::Removed { path, value: old_val },
            _ => FieldChange::Modified {
                path,
                old: old_val,
                new: new_val,
            },
        };
        changes.push(change);
    }

    RecordDiff { changes }
}
