//! TOML rule files layered over the default [`AuthorityTable`].
//!
//! ```toml
//! strategic_order = ["models_dev_http", "local_catalog"]
//!
//! [[authority]]
//! resource = "model"
//! field = "pricing.currency"
//! source = "local_catalog"
//!
//! [[priority]]
//! resource = "model"
//! field = "description"
//! sources = ["models_dev_http", "local_catalog"]
//!
//! [[policy]]
//! resource = "provider"
//! field = "name"
//! policy = "take_either"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use starmap_types::{FieldPath, MergeMode, MergePolicy, ResourceType, SourceName};

use crate::authority::{is_known_path, AuthorityTable};
use crate::error::{MergeError, MergeResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthorityRule {
    pub resource: ResourceType,
    pub field: String,
    pub source: SourceName,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PriorityRule {
    pub resource: ResourceType,
    pub field: String,
    pub sources: Vec<SourceName>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyRule {
    pub resource: ResourceType,
    pub field: String,
    pub policy: MergePolicy,
}

/// A parsed rule file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RulesConfig {
    #[serde(rename = "authority")]
    pub authorities: Vec<AuthorityRule>,
    #[serde(rename = "priority")]
    pub priorities: Vec<PriorityRule>,
    #[serde(rename = "policy")]
    pub policies: Vec<PolicyRule>,
    pub strategic_order: Option<Vec<SourceName>>,
    pub three_way_order: Option<Vec<SourceName>>,
}

impl RulesConfig {
    pub fn from_toml_str(s: &str) -> MergeResult<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> MergeResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| MergeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn is_empty(&self) -> bool {
        self.authorities.is_empty()
            && self.priorities.is_empty()
            && self.policies.is_empty()
            && self.strategic_order.is_none()
            && self.three_way_order.is_none()
    }
}

impl AuthorityTable {
    /// Layer `rules` over this table. Later rows replace earlier ones for the
    /// same key.
    pub fn with_rules(self, rules: &RulesConfig) -> MergeResult<Self> {
        let mut table = self;

        if let Some(order) = &rules.strategic_order {
            table = table.with_default_order(MergeMode::Strategic, order.clone())?;
        }
        if let Some(order) = &rules.three_way_order {
            table = table.with_default_order(MergeMode::ThreeWay, order.clone())?;
        }
        for rule in &rules.authorities {
            let field = check_field(rule.resource, &rule.field)?;
            table = table.with_authority(rule.resource, field, rule.source);
        }
        for rule in &rules.priorities {
            let field = check_field(rule.resource, &rule.field)?;
            table = table.with_priority(rule.resource, field, rule.sources.clone())?;
        }
        for rule in &rules.policies {
            let field = check_field(rule.resource, &rule.field)?;
            table = table.with_policy(rule.resource, field, rule.policy);
        }

        debug!(
            authorities = rules.authorities.len(),
            priorities = rules.priorities.len(),
            policies = rules.policies.len(),
            "applied authority rules"
        );
        Ok(table)
    }

    /// The default table with the rules in `s` applied.
    pub fn from_toml_str(s: &str) -> MergeResult<Self> {
        Self::default().with_rules(&RulesConfig::from_toml_str(s)?)
    }

    /// The default table with the rules in the file at `path` applied.
    pub fn load(path: impl AsRef<Path>) -> MergeResult<Self> {
        Self::default().with_rules(&RulesConfig::load(path)?)
    }
}

/// Parse a rule's field path and check it names a field or field prefix of
/// `resource`.
fn check_field(resource: ResourceType, field: &str) -> MergeResult<FieldPath> {
    let field = FieldPath::parse(field)?;
    if is_known_path(resource, &field) {
        Ok(field)
    } else {
        Err(MergeError::UnknownField {
            resource,
            path: field.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use starmap_types::TypeError;
    use std::io::Write;

    const RULES: &str = r#"
strategic_order = ["models_dev_git", "models_dev_http", "local_catalog", "provider_api"]

[[authority]]
resource = "model"
field = "pricing.currency"
source = "local_catalog"

[[priority]]
resource = "model"
field = "description"
sources = ["models_dev_http", "local_catalog"]

[[policy]]
resource = "provider"
field = "name"
policy = "take_either"
"#;

    #[test]
    fn parse_rule_rows() {
        let rules = RulesConfig::from_toml_str(RULES).unwrap();
        assert_eq!(rules.authorities.len(), 1);
        assert_eq!(rules.authorities[0].source, SourceName::LocalCatalog);
        assert_eq!(rules.priorities[0].sources.len(), 2);
        assert_eq!(rules.policies[0].policy, MergePolicy::TakeEither);
        assert!(rules.three_way_order.is_none());
        assert!(RulesConfig::from_toml_str("").unwrap().is_empty());
    }

    #[test]
    fn rules_layer_over_defaults() {
        let table = AuthorityTable::from_toml_str(RULES).unwrap();
        let currency = table
            .get_authority(&FieldPath::from("pricing.currency"), ResourceType::Model)
            .unwrap();
        assert_eq!(currency.source, SourceName::LocalCatalog);
        // default rows survive
        let input = table
            .get_authority(&FieldPath::from("pricing.tokens.input"), ResourceType::Model)
            .unwrap();
        assert_eq!(input.source, SourceName::ModelsDevHttp);

        assert_eq!(
            table.priority(MergeMode::Strategic, ResourceType::Model, &FieldPath::from("name"))[0],
            SourceName::ModelsDevGit
        );
        assert_eq!(
            table.policy_override(&FieldPath::from("name"), ResourceType::Provider),
            Some(MergePolicy::TakeEither)
        );
    }

    #[test]
    fn unknown_field_rejected() {
        let err = AuthorityTable::from_toml_str(
            r#"
[[authority]]
resource = "provider"
field = "pricing"
source = "provider_api"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, MergeError::UnknownField { resource: ResourceType::Provider, .. }));
    }

    #[test]
    fn bad_values_rejected() {
        let unknown_source = r#"
[[authority]]
resource = "model"
field = "name"
source = "wikipedia"
"#;
        assert!(matches!(
            AuthorityTable::from_toml_str(unknown_source),
            Err(MergeError::Parse(_))
        ));

        let bad_path = r#"
[[policy]]
resource = "model"
field = "limits..context_window"
policy = "numeric_max"
"#;
        match AuthorityTable::from_toml_str(bad_path) {
            Err(MergeError::InvalidRule(TypeError::InvalidFieldPath(path))) => {
                assert_eq!(path, "limits..context_window");
            }
            other => panic!("expected InvalidRule, got {other:?}"),
        }

        let mixed = r#"
[[priority]]
resource = "model"
field = "name"
sources = ["ours", "local_catalog"]
"#;
        assert!(matches!(
            AuthorityTable::from_toml_str(mixed),
            Err(MergeError::MixedPriority { .. })
        ));

        assert!(RulesConfig::from_toml_str("colour = \"blue\"").is_err());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(RULES.as_bytes()).unwrap();
        let table = AuthorityTable::load(file.path()).unwrap();
        assert_eq!(table.authorities().len(), AuthorityTable::default().authorities().len() + 1);
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = AuthorityTable::load(dir.path().join("rules.toml")).unwrap_err();
        assert!(matches!(err, MergeError::Io { .. }));
    }
}
