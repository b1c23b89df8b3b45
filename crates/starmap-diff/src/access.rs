//! Typed field access by path.
//!
//! A [`FieldSpec`] pairs a path with a getter and a setter written against the
//! concrete record type, so an unresolvable path is a table miss rather than a
//! runtime reflection failure. The only fallible step is decoding a
//! `serde_json::Value` into the field's Rust type on write.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use starmap_types::{FieldPath, MergePolicy, ResourceType};

use crate::error::{DiffResult, FieldError};

/// Reads a field as a JSON value. Absent optional parents read as `null`.
pub type Getter<R> = fn(&R) -> Value;

/// Writes a JSON value into a field, creating absent optional parents.
pub type Setter<R> = fn(&mut R, Value) -> Result<(), serde_json::Error>;

/// One row of a record type's field table.
pub struct FieldSpec<R> {
    pub(crate) path: &'static str,
    pub(crate) policy: MergePolicy,
    pub(crate) get: Getter<R>,
    pub(crate) set: Setter<R>,
}

impl<R> FieldSpec<R> {
    pub fn path(&self) -> &'static str {
        self.path
    }

    pub fn field_path(&self) -> FieldPath {
        FieldPath::from(self.path)
    }

    /// The default merge policy for this field.
    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    /// Read the field from `record`.
    pub fn get(&self, record: &R) -> Value {
        (self.get)(record)
    }

    /// Write `value` into the field of `record`.
    ///
    /// `null` writes the field type's default. On a decode error the record
    /// is left unchanged.
    pub fn set(&self, record: &mut R, value: Value) -> DiffResult<()> {
        (self.set)(record, value).map_err(|source| FieldError::Decode {
            path: self.path.to_string(),
            source,
        })
    }
}

impl<R> fmt::Debug for FieldSpec<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("path", &self.path)
            .field("policy", &self.policy)
            .finish()
    }
}

/// An optional sub-structure that nested table rows write through.
///
/// Nested setters create the parent on demand, so a merge that should leave a
/// parent absent has to clear it explicitly.
pub struct ParentSpec<R> {
    pub(crate) root: &'static str,
    pub(crate) present: fn(&R) -> bool,
    pub(crate) clear: fn(&mut R),
}

impl<R> ParentSpec<R> {
    pub fn root(&self) -> &'static str {
        self.root
    }

    pub fn is_present(&self, record: &R) -> bool {
        (self.present)(record)
    }

    pub fn clear(&self, record: &mut R) {
        (self.clear)(record)
    }
}

impl<R> fmt::Debug for ParentSpec<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParentSpec").field("root", &self.root).finish()
    }
}

/// A catalog record that can be merged field by field.
pub trait Record: Clone + fmt::Debug + Send + Sync + 'static {
    const RESOURCE_TYPE: ResourceType;

    fn id(&self) -> &str;

    /// An otherwise empty record with the given ID.
    fn with_id(id: &str) -> Self;

    /// The field table, in a fixed order.
    ///
    /// Identity and timestamps are not in the table; merges handle them
    /// explicitly.
    fn fields() -> &'static [FieldSpec<Self>];

    /// Optional sub-structures holding nested table rows.
    fn parents() -> &'static [ParentSpec<Self>] {
        &[]
    }

    fn created_at(&self) -> Option<DateTime<Utc>>;

    fn updated_at(&self) -> Option<DateTime<Utc>>;

    fn set_timestamps(
        &mut self,
        created_at: Option<DateTime<Utc>>,
        updated_at: Option<DateTime<Utc>>,
    );

    /// Look up a table row by path.
    fn field(path: &str) -> Option<&'static FieldSpec<Self>> {
        Self::fields().iter().find(|spec| spec.path == path)
    }
}

/// Read the field at `path` from `record`.
pub fn get_path<R: Record>(record: &R, path: &str) -> DiffResult<Value> {
    let spec = R::field(path).ok_or_else(|| unknown::<R>(path))?;
    Ok(spec.get(record))
}

/// Write `value` into the field at `path` of `record`.
pub fn set_path<R: Record>(record: &mut R, path: &str, value: Value) -> DiffResult<()> {
    let spec = R::field(path).ok_or_else(|| unknown::<R>(path))?;
    spec.set(record, value)
}

fn unknown<R: Record>(path: &str) -> FieldError {
    FieldError::UnknownField {
        resource: R::RESOURCE_TYPE,
        path: path.to_string(),
    }
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

pub(crate) fn decode<T: DeserializeOwned + Default>(value: Value) -> Result<T, serde_json::Error> {
    if value.is_null() {
        Ok(T::default())
    } else {
        serde_json::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use starmap_types::{Author, Model, ModelLimits, ModelModality};

    #[test]
    fn get_top_level_and_nested() {
        let mut model = Model::new("gpt-4o", "GPT-4o");
        assert_eq!(get_path(&model, "name").unwrap(), json!("GPT-4o"));
        assert_eq!(get_path(&model, "limits.context_window").unwrap(), Value::Null);

        model.limits = Some(ModelLimits {
            context_window: 128_000,
            output_tokens: 16_384,
        });
        assert_eq!(get_path(&model, "limits.context_window").unwrap(), json!(128_000));
    }

    #[test]
    fn set_creates_missing_parent() {
        let mut model = Model::new("m", "M");
        set_path(&mut model, "features.modalities.input", json!(["text", "image"])).unwrap();
        let features = model.features.expect("features created");
        assert_eq!(
            features.modalities.input,
            vec![ModelModality::Text, ModelModality::Image]
        );
        assert!(!features.tool_calls);
    }

    #[test]
    fn set_null_writes_default() {
        let mut author = Author::new("meta", "Meta");
        author.aliases = vec!["facebook".into()];
        author.website = Some("https://ai.meta.com".into());
        set_path(&mut author, "aliases", Value::Null).unwrap();
        set_path(&mut author, "website", Value::Null).unwrap();
        assert!(author.aliases.is_empty());
        assert!(author.website.is_none());
    }

    #[test]
    fn decode_error_leaves_record_unchanged() {
        let mut model = Model::new("m", "M");
        let err = set_path(&mut model, "limits.context_window", json!("lots")).unwrap_err();
        assert!(matches!(err, FieldError::Decode { .. }));
        assert!(model.limits.is_none());
    }

    #[test]
    fn unknown_path() {
        let model = Model::new("m", "M");
        let err = get_path(&model, "limits.max_images").unwrap_err();
        match err {
            FieldError::UnknownField { resource, path } => {
                assert_eq!(resource, ResourceType::Model);
                assert_eq!(path, "limits.max_images");
            }
            other => panic!("expected UnknownField, got {other:?}"),
        }
    }

    #[test]
    fn table_paths_are_unique() {
        fn check<R: Record>() {
            let mut seen = std::collections::HashSet::new();
            for spec in R::fields() {
                assert!(seen.insert(spec.path()), "duplicate path {}", spec.path());
                assert!(FieldPath::parse(spec.path()).is_ok());
            }
        }
        check::<Model>();
        check::<starmap_types::Provider>();
        check::<Author>();
    }
}
