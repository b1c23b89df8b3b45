//! The provenance value returned by a merge call.

use std::collections::btree_map::{self, BTreeMap};

use serde::{Deserialize, Serialize};

use starmap_types::{ResourceType, SourceName};

use crate::records::{FieldProvenance, ProvenanceInfo, ProvenanceKey};

/// Provenance for many fields, ordered by key.
///
/// Plain owned data with no interior mutability: a merge call builds one
/// and hands it to the caller.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    into = "Vec<(ProvenanceKey, FieldProvenance)>",
    from = "Vec<(ProvenanceKey, FieldProvenance)>"
)]
pub struct ProvenanceMap {
    entries: BTreeMap<ProvenanceKey, FieldProvenance>,
}

impl ProvenanceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record `info` as the current winner for the field at `key`, pushing
    /// any previous winner onto the field's history.
    pub fn track(&mut self, key: ProvenanceKey, info: ProvenanceInfo) {
        match self.entries.entry(key) {
            btree_map::Entry::Occupied(mut entry) => entry.get_mut().push(info),
            btree_map::Entry::Vacant(entry) => {
                entry.insert(FieldProvenance::new(info));
            }
        }
    }

    /// Shorthand for [`track`](Self::track) that builds the key.
    pub fn track_field(
        &mut self,
        resource_type: ResourceType,
        resource_id: &str,
        info: ProvenanceInfo,
    ) {
        let key = ProvenanceKey::new(resource_type, resource_id, info.field.clone());
        self.track(key, info);
    }

    pub fn get(&self, key: &ProvenanceKey) -> Option<&FieldProvenance> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ProvenanceKey, &FieldProvenance)> {
        self.entries.iter()
    }

    /// All fields recorded for one resource, in field order.
    pub fn for_resource<'a>(
        &'a self,
        resource_type: ResourceType,
        resource_id: &'a str,
    ) -> impl Iterator<Item = (&'a ProvenanceKey, &'a FieldProvenance)> {
        self.entries.iter().filter(move |(key, _)| {
            key.resource_type == resource_type && key.resource_id == resource_id
        })
    }

    /// All fields whose current winner is `source`.
    pub fn won_by(
        &self,
        source: SourceName,
    ) -> impl Iterator<Item = (&ProvenanceKey, &FieldProvenance)> {
        self.entries
            .iter()
            .filter(move |(_, field)| field.current.source == source)
    }

    /// Fold `other` into this map. For keys present in both, each of
    /// `other`'s versions (history first, then current) is tracked in order.
    pub fn extend(&mut self, other: ProvenanceMap) {
        for (key, field) in other.entries {
            for info in field.history.into_iter().chain(std::iter::once(field.current)) {
                self.track(key.clone(), info);
            }
        }
    }
}

impl IntoIterator for ProvenanceMap {
    type Item = (ProvenanceKey, FieldProvenance);
    type IntoIter = btree_map::IntoIter<ProvenanceKey, FieldProvenance>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl From<ProvenanceMap> for Vec<(ProvenanceKey, FieldProvenance)> {
    fn from(map: ProvenanceMap) -> Self {
        map.entries.into_iter().collect()
    }
}

impl From<Vec<(ProvenanceKey, FieldProvenance)>> for ProvenanceMap {
    fn from(entries: Vec<(ProvenanceKey, FieldProvenance)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }
}
