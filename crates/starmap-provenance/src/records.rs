use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use starmap_types::{FieldPath, ResourceType, SourceName};

/// Addresses one field of one record.
///
/// Displays as `resource_type.resource_id.field`, e.g.
/// `model.gpt-4o.pricing`. Resource IDs may themselves contain dots, so the
/// display form is for humans and logs; lookups use the structured key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProvenanceKey {
    pub resource_type: ResourceType,
    pub resource_id: String,
    pub field: FieldPath,
}

impl ProvenanceKey {
    pub fn new(
        resource_type: ResourceType,
        resource_id: impl Into<String>,
        field: FieldPath,
    ) -> Self {
        Self {
            resource_type,
            resource_id: resource_id.into(),
            field,
        }
    }
}

impl fmt::Display for ProvenanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.resource_type, self.resource_id, self.field)
    }
}

/// Which source supplied a field's value, and when.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceInfo {
    pub source: SourceName,
    pub field: FieldPath,
    pub value: Value,
    pub timestamp: DateTime<Utc>,
}

impl ProvenanceInfo {
    pub fn new(
        source: SourceName,
        field: FieldPath,
        value: Value,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            source,
            field,
            value,
            timestamp,
        }
    }

    /// Returns `true` if `other` records the same winner and value,
    /// ignoring the timestamp.
    pub fn same_outcome(&self, other: &ProvenanceInfo) -> bool {
        self.source == other.source && self.value == other.value
    }
}

/// The current winner of a field plus every earlier winner, oldest first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldProvenance {
    pub current: ProvenanceInfo,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<ProvenanceInfo>,
}

impl FieldProvenance {
    pub fn new(current: ProvenanceInfo) -> Self {
        Self {
            current,
            history: Vec::new(),
        }
    }

    /// Make `info` current, pushing the previous current onto the history.
    pub fn push(&mut self, info: ProvenanceInfo) {
        let previous = std::mem::replace(&mut self.current, info);
        self.history.push(previous);
    }

    /// Number of recorded winners, including the current one.
    pub fn versions(&self) -> usize {
        self.history.len() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn info(source: SourceName, value: Value) -> ProvenanceInfo {
        ProvenanceInfo::new(source, FieldPath::from("name"), value, DateTime::<Utc>::UNIX_EPOCH)
    }

    #[test]
    fn key_display() {
        let key = ProvenanceKey::new(ResourceType::Model, "gpt-4o", FieldPath::from("pricing"));
        assert_eq!(key.to_string(), "model.gpt-4o.pricing");
    }

    #[test]
    fn push_moves_current_to_history() {
        let mut field = FieldProvenance::new(info(SourceName::LocalCatalog, json!("a")));
        field.push(info(SourceName::ModelsDevHttp, json!("b")));
        field.push(info(SourceName::ProviderApi, json!("c")));

        assert_eq!(field.current.source, SourceName::ProviderApi);
        assert_eq!(field.versions(), 3);
        assert_eq!(field.history[0].source, SourceName::LocalCatalog);
        assert_eq!(field.history[1].value, json!("b"));
    }

    #[test]
    fn same_outcome_ignores_timestamp() {
        let a = info(SourceName::LocalCatalog, json!("x"));
        let mut b = a.clone();
        b.timestamp = Utc::now();
        assert!(a.same_outcome(&b));
        b.source = SourceName::ModelsDevGit;
        assert!(!a.same_outcome(&b));
    }
}
