//! Picking one value out of several candidate sources.

use std::collections::BTreeMap;

use serde_json::Value;

use starmap_types::{FieldPath, MergeMode, ResourceType, SourceName};

use crate::authority::AuthorityTable;

/// The value chosen for a field and where it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolved {
    pub value: Value,
    pub source: SourceName,
    /// `true` if the winner is the field's registered authority.
    pub by_authority: bool,
}

/// Chooses one value for a field from candidate values keyed by source.
///
/// Implementations must be deterministic: the same candidate set always
/// yields the same winner.
pub trait ResolutionStrategy {
    fn resolve(
        &self,
        resource: ResourceType,
        path: &FieldPath,
        values: &BTreeMap<SourceName, Value>,
    ) -> Option<Resolved>;
}

/// Authority first, then the table's fallback order for the merge mode,
/// then any remaining source in [`SourceName`] order.
#[derive(Clone, Copy, Debug)]
pub struct AuthorityStrategy<'a> {
    table: &'a AuthorityTable,
    mode: MergeMode,
}

impl<'a> AuthorityStrategy<'a> {
    pub fn new(table: &'a AuthorityTable, mode: MergeMode) -> Self {
        Self { table, mode }
    }

    pub fn mode(&self) -> MergeMode {
        self.mode
    }

    /// The order in which sources are tried for `path`.
    pub fn candidate_order(&self, resource: ResourceType, path: &FieldPath) -> Vec<SourceName> {
        let mut order = Vec::new();
        if let Some(authority) = self.table.get_authority(path, resource) {
            order.push(authority.source);
        }
        for source in self.table.priority(self.mode, resource, path) {
            if !order.contains(source) {
                order.push(*source);
            }
        }
        order
    }

    /// Pick the first candidate in [`candidate_order`](Self::candidate_order).
    ///
    /// Candidates from sources outside that order are considered last, in
    /// key order.
    pub fn pick<'v, T>(
        &self,
        resource: ResourceType,
        path: &FieldPath,
        candidates: &'v BTreeMap<SourceName, T>,
    ) -> Option<(SourceName, &'v T)> {
        pick_in_order(self.candidate_order(resource, path), candidates)
    }
}

impl ResolutionStrategy for AuthorityStrategy<'_> {
    fn resolve(
        &self,
        resource: ResourceType,
        path: &FieldPath,
        values: &BTreeMap<SourceName, Value>,
    ) -> Option<Resolved> {
        let (source, value) = self.pick(resource, path, values)?;
        let by_authority = self
            .table
            .get_authority(path, resource)
            .is_some_and(|authority| authority.source == source);
        Some(Resolved {
            value: value.clone(),
            source,
            by_authority,
        })
    }
}

/// First candidate whose source appears in `order`; failing that, the first
/// candidate in key order.
pub fn pick_in_order<'v, T>(
    order: impl IntoIterator<Item = SourceName>,
    candidates: &'v BTreeMap<SourceName, T>,
) -> Option<(SourceName, &'v T)> {
    order
        .into_iter()
        .find_map(|source| candidates.get(&source).map(|value| (source, value)))
        .or_else(|| candidates.iter().next().map(|(source, value)| (*source, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values(pairs: &[(SourceName, Value)]) -> BTreeMap<SourceName, Value> {
        pairs.iter().cloned().collect()
    }

    #[test]
    fn authority_wins_when_present() {
        let table = AuthorityTable::default();
        let strategy = AuthorityStrategy::new(&table, MergeMode::Strategic);
        let candidates = values(&[
            (SourceName::LocalCatalog, json!(1.0)),
            (SourceName::ModelsDevHttp, json!(2.5)),
        ]);
        let resolved = strategy
            .resolve(ResourceType::Model, &FieldPath::from("pricing.tokens.input"), &candidates)
            .unwrap();
        assert_eq!(resolved.source, SourceName::ModelsDevHttp);
        assert_eq!(resolved.value, json!(2.5));
        assert!(resolved.by_authority);
    }

    #[test]
    fn fallback_when_authority_absent() {
        let table = AuthorityTable::default();
        let strategy = AuthorityStrategy::new(&table, MergeMode::Strategic);
        let candidates = values(&[
            (SourceName::ProviderApi, json!(3.0)),
            (SourceName::ModelsDevGit, json!(2.0)),
        ]);
        let resolved = strategy
            .resolve(ResourceType::Model, &FieldPath::from("pricing.tokens.input"), &candidates)
            .unwrap();
        assert_eq!(resolved.source, SourceName::ModelsDevGit);
        assert!(!resolved.by_authority);
    }

    #[test]
    fn identity_fields_use_fixed_priority() {
        let table = AuthorityTable::default();
        let strategy = AuthorityStrategy::new(&table, MergeMode::Strategic);
        let candidates = values(&[
            (SourceName::ProviderApi, json!("gpt-4o-2024-08-06")),
            (SourceName::ModelsDevHttp, json!("GPT-4o")),
            (SourceName::LocalCatalog, json!("GPT 4o")),
        ]);
        let resolved = strategy
            .resolve(ResourceType::Model, &FieldPath::from("name"), &candidates)
            .unwrap();
        assert_eq!(resolved.source, SourceName::LocalCatalog);
    }

    #[test]
    fn three_way_prefers_ours() {
        let table = AuthorityTable::default();
        let strategy = AuthorityStrategy::new(&table, MergeMode::ThreeWay);
        let candidates = values(&[
            (SourceName::Base, json!("Original")),
            (SourceName::Theirs, json!("Their Name")),
            (SourceName::Ours, json!("Our Name")),
        ]);
        let resolved = strategy
            .resolve(ResourceType::Model, &FieldPath::from("name"), &candidates)
            .unwrap();
        assert_eq!(resolved.source, SourceName::Ours);
    }

    #[test]
    fn sources_outside_order_come_last() {
        let table = AuthorityTable::default()
            .with_default_order(MergeMode::Strategic, vec![SourceName::ModelsDevGit])
            .unwrap();
        let strategy = AuthorityStrategy::new(&table, MergeMode::Strategic);
        let candidates = values(&[
            (SourceName::ProviderApi, json!("b")),
            (SourceName::LocalCatalog, json!("a")),
        ]);
        let resolved = strategy
            .resolve(ResourceType::Author, &FieldPath::from("name"), &candidates)
            .unwrap();
        assert_eq!(resolved.source, SourceName::LocalCatalog);
    }

    #[test]
    fn no_candidates() {
        let table = AuthorityTable::default();
        let strategy = AuthorityStrategy::new(&table, MergeMode::Strategic);
        assert!(strategy
            .resolve(ResourceType::Model, &FieldPath::from("name"), &BTreeMap::new())
            .is_none());
    }
}
