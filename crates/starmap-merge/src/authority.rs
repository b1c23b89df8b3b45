//! Field-level authority rules.
//!
//! An [`AuthorityTable`] answers three questions for a `(resource type, field
//! path)` pair:
//!
//! - which single source is authoritative for it, if any;
//! - in which order to try the remaining sources when there is no authority
//!   (or the authority did not supply a value);
//! - which [`MergePolicy`] overrides the field table's default.
//!
//! All three are looked up by exact path first and then by the longest
//! registered dotted prefix, so a rule for `pricing` covers
//! `pricing.tokens.input`. The table is an immutable value handed to each
//! merger; nothing here is global.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use starmap_diff::{FieldSpec, Record};
use starmap_types::{
    Author, FieldPath, MergeMode, MergePolicy, Model, Provider, ResourceType, SourceName,
};

use crate::error::{MergeError, MergeResult};

/// One authority row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authority {
    pub field: FieldPath,
    pub resource: ResourceType,
    pub source: SourceName,
}

type Key = (ResourceType, String);

/// Authority, fallback-priority and merge-policy rules.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorityTable {
    authorities: BTreeMap<Key, SourceName>,
    priorities: BTreeMap<(MergeMode, ResourceType, String), Vec<SourceName>>,
    policies: BTreeMap<Key, MergePolicy>,
    strategic_order: Vec<SourceName>,
    three_way_order: Vec<SourceName>,
}

/// Live-capability flags reported authoritatively by provider APIs.
const PROVIDER_API_FLAGS: [&str; 7] = [
    "features.streaming",
    "features.temperature",
    "features.top_p",
    "features.top_k",
    "features.max_tokens",
    "features.stop",
    "features.seed",
];

impl AuthorityTable {
    /// A table with no rows and the default fallback orders.
    pub fn empty() -> Self {
        Self {
            authorities: BTreeMap::new(),
            priorities: BTreeMap::new(),
            policies: BTreeMap::new(),
            strategic_order: SourceName::STRATEGIC.to_vec(),
            three_way_order: SourceName::THREE_WAY.to_vec(),
        }
    }

    /// Register `source` as the authority for `field` on `resource`.
    pub fn with_authority(
        mut self,
        resource: ResourceType,
        field: impl Into<FieldPath>,
        source: SourceName,
    ) -> Self {
        let field: FieldPath = field.into();
        self.authorities.insert((resource, field.into()), source);
        self
    }

    /// Replace the fallback order for `field` on `resource`. The merge mode
    /// the override applies to is taken from the listed sources.
    pub fn with_priority(
        mut self,
        resource: ResourceType,
        field: impl Into<FieldPath>,
        sources: Vec<SourceName>,
    ) -> MergeResult<Self> {
        let field: FieldPath = field.into();
        let mode = single_mode(&sources).ok_or_else(|| MergeError::MixedPriority {
            field: field.to_string(),
        })?;
        self.priorities.insert((mode, resource, field.into()), sources);
        Ok(self)
    }

    /// Override the merge policy of `field` (and fields below it) on
    /// `resource`.
    pub fn with_policy(
        mut self,
        resource: ResourceType,
        field: impl Into<FieldPath>,
        policy: MergePolicy,
    ) -> Self {
        let field: FieldPath = field.into();
        self.policies.insert((resource, field.into()), policy);
        self
    }

    /// Replace the default fallback order of a merge mode.
    pub fn with_default_order(
        mut self,
        mode: MergeMode,
        sources: Vec<SourceName>,
    ) -> MergeResult<Self> {
        if single_mode(&sources) != Some(mode) {
            return Err(MergeError::MixedPriority {
                field: format!("<{mode} default>"),
            });
        }
        match mode {
            MergeMode::Strategic => self.strategic_order = sources,
            MergeMode::ThreeWay => self.three_way_order = sources,
        }
        Ok(self)
    }

    /// The authority for `path` on `resource`, if one is registered for the
    /// path or one of its prefixes.
    pub fn get_authority(&self, path: &FieldPath, resource: ResourceType) -> Option<Authority> {
        path.ancestors().find_map(|candidate| {
            self.authorities
                .get(&(resource, candidate.to_string()))
                .map(|source| Authority {
                    field: FieldPath::from(candidate),
                    resource,
                    source: *source,
                })
        })
    }

    /// Fallback order for `path` on `resource` in `mode`.
    pub fn priority(
        &self,
        mode: MergeMode,
        resource: ResourceType,
        path: &FieldPath,
    ) -> &[SourceName] {
        path.ancestors()
            .find_map(|candidate| self.priorities.get(&(mode, resource, candidate.to_string())))
            .map_or_else(|| self.default_order(mode), Vec::as_slice)
    }

    /// The default fallback order of `mode`.
    pub fn default_order(&self, mode: MergeMode) -> &[SourceName] {
        match mode {
            MergeMode::Strategic => &self.strategic_order,
            MergeMode::ThreeWay => &self.three_way_order,
        }
    }

    /// The policy override for `path` on `resource`, if any.
    pub fn policy_override(&self, path: &FieldPath, resource: ResourceType) -> Option<MergePolicy> {
        path.ancestors()
            .find_map(|candidate| self.policies.get(&(resource, candidate.to_string())))
            .copied()
    }

    /// The policy a merge applies to `spec`: the override, else the field
    /// table default.
    pub fn policy_for<R: Record>(&self, spec: &FieldSpec<R>) -> MergePolicy {
        self.policy_override(&spec.field_path(), R::RESOURCE_TYPE)
            .unwrap_or_else(|| spec.policy())
    }

    /// All authority rows, ordered by resource type then path.
    pub fn authorities(&self) -> Vec<Authority> {
        self.authorities
            .iter()
            .map(|((resource, field), source)| Authority {
                field: FieldPath::from(field.as_str()),
                resource: *resource,
                source: *source,
            })
            .collect()
    }

    /// All priority overrides as `(mode, resource, path, sources)`.
    pub fn priority_overrides(
        &self,
    ) -> impl Iterator<Item = (MergeMode, ResourceType, &str, &[SourceName])> {
        self.priorities.iter().map(|((mode, resource, field), sources)| {
            (*mode, *resource, field.as_str(), sources.as_slice())
        })
    }

    /// All policy overrides as `(resource, path, policy)`.
    pub fn policy_overrides(&self) -> impl Iterator<Item = (ResourceType, &str, MergePolicy)> {
        self.policies
            .iter()
            .map(|((resource, field), policy)| (*resource, field.as_str(), *policy))
    }
}

impl Default for AuthorityTable {
    /// Identity fields (`name`, `description`, `authors`) have no authority;
    /// pricing, limits and metadata belong to the aggregator; live
    /// capability flags belong to the provider API.
    fn default() -> Self {
        let mut table = Self::empty()
            .with_authority(ResourceType::Model, "pricing", SourceName::ModelsDevHttp)
            .with_authority(ResourceType::Model, "limits", SourceName::ModelsDevHttp)
            .with_authority(ResourceType::Model, "metadata", SourceName::ModelsDevHttp);
        for flag in PROVIDER_API_FLAGS {
            table = table.with_authority(ResourceType::Model, flag, SourceName::ProviderApi);
        }
        table
    }
}

/// Returns `true` if `path` is a field of `resource`, or a prefix of one.
pub fn is_known_path(resource: ResourceType, path: &FieldPath) -> bool {
    fn known<R: Record>(path: &FieldPath) -> bool {
        R::fields()
            .iter()
            .any(|spec| spec.field_path().starts_with(path.as_str()))
    }

    match resource {
        ResourceType::Model => known::<Model>(path),
        ResourceType::Provider => known::<Provider>(path),
        ResourceType::Author => known::<Author>(path),
    }
}

fn single_mode(sources: &[SourceName]) -> Option<MergeMode> {
    let mode = sources.first()?.mode();
    sources.iter().all(|s| s.mode() == mode).then_some(mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &'static str) -> FieldPath {
        FieldPath::from(s)
    }

    #[test]
    fn identity_fields_have_no_authority() {
        let table = AuthorityTable::default();
        for field in ["name", "description", "authors"] {
            assert!(table.get_authority(&path(field), ResourceType::Model).is_none());
        }
    }

    #[test]
    fn aggregator_owns_pricing_limits_metadata() {
        let table = AuthorityTable::default();
        for field in ["pricing", "pricing.tokens.input", "limits.context_window", "metadata.tags"] {
            let authority = table.get_authority(&path(field), ResourceType::Model).unwrap();
            assert_eq!(authority.source, SourceName::ModelsDevHttp, "{field}");
        }
    }

    #[test]
    fn provider_api_owns_live_capabilities() {
        let table = AuthorityTable::default();
        let authority = table
            .get_authority(&path("features.streaming"), ResourceType::Model)
            .unwrap();
        assert_eq!(authority.source, SourceName::ProviderApi);
        assert!(table
            .get_authority(&path("features.tool_calls"), ResourceType::Model)
            .is_none());
    }

    #[test]
    fn authority_is_scoped_by_resource_type() {
        let table = AuthorityTable::default();
        assert!(table.get_authority(&path("pricing"), ResourceType::Provider).is_none());
    }

    #[test]
    fn exact_row_beats_prefix() {
        let table = AuthorityTable::default().with_authority(
            ResourceType::Model,
            "pricing.currency",
            SourceName::LocalCatalog,
        );
        let exact = table.get_authority(&path("pricing.currency"), ResourceType::Model).unwrap();
        assert_eq!(exact.source, SourceName::LocalCatalog);
        assert_eq!(exact.field, "pricing.currency");
        let prefix = table
            .get_authority(&path("pricing.tokens.output"), ResourceType::Model)
            .unwrap();
        assert_eq!(prefix.source, SourceName::ModelsDevHttp);
        assert_eq!(prefix.field, "pricing");
    }

    #[test]
    fn default_orders() {
        let table = AuthorityTable::default();
        assert_eq!(
            table.priority(MergeMode::Strategic, ResourceType::Model, &path("name")),
            &SourceName::STRATEGIC
        );
        assert_eq!(
            table.priority(MergeMode::ThreeWay, ResourceType::Model, &path("name")),
            &SourceName::THREE_WAY
        );
    }

    #[test]
    fn per_field_priority_override() {
        let table = AuthorityTable::default()
            .with_priority(
                ResourceType::Model,
                "description",
                vec![SourceName::ModelsDevHttp, SourceName::LocalCatalog],
            )
            .unwrap();
        assert_eq!(
            table.priority(MergeMode::Strategic, ResourceType::Model, &path("description")),
            &[SourceName::ModelsDevHttp, SourceName::LocalCatalog]
        );
        // other fields and the three-way mode keep their defaults
        assert_eq!(
            table.priority(MergeMode::Strategic, ResourceType::Model, &path("name")),
            &SourceName::STRATEGIC
        );
        assert_eq!(
            table.priority(MergeMode::ThreeWay, ResourceType::Model, &path("description")),
            &SourceName::THREE_WAY
        );
    }

    #[test]
    fn mixed_priority_rejected() {
        let err = AuthorityTable::default()
            .with_priority(
                ResourceType::Model,
                "name",
                vec![SourceName::Ours, SourceName::LocalCatalog],
            )
            .unwrap_err();
        assert!(matches!(err, MergeError::MixedPriority { .. }));
        assert!(AuthorityTable::default()
            .with_default_order(MergeMode::ThreeWay, vec![SourceName::ProviderApi])
            .is_err());
    }

    #[test]
    fn policy_override_by_prefix() {
        let table = AuthorityTable::default().with_policy(
            ResourceType::Model,
            "metadata",
            MergePolicy::TakeEither,
        );
        let spec = Model::field("metadata.release_date").unwrap();
        assert_eq!(table.policy_for(spec), MergePolicy::TakeEither);
        let spec = Model::field("name").unwrap();
        assert_eq!(table.policy_for(spec), MergePolicy::Manual);
    }

    #[test]
    fn known_paths() {
        assert!(is_known_path(ResourceType::Model, &path("pricing")));
        assert!(is_known_path(ResourceType::Model, &path("features.modalities")));
        assert!(is_known_path(ResourceType::Provider, &path("catalog.docs_url")));
        assert!(!is_known_path(ResourceType::Provider, &path("pricing")));
        assert!(!is_known_path(ResourceType::Model, &path("limit")));
    }
}
