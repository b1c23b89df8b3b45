use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The kind of catalog record a value belongs to.
///
/// Scopes authority lookups (the same field path can have different
/// authorities on models and providers) and provenance keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Model,
    Provider,
    Author,
}

impl ResourceType {
    /// All resource types in declaration order.
    pub const ALL: [ResourceType; 3] = [Self::Model, Self::Provider, Self::Author];

    /// Lower-case name used in provenance keys and config files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Provider => "provider",
            Self::Author => "author",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "model" | "models" => Ok(Self::Model),
            "provider" | "providers" => Ok(Self::Provider),
            "author" | "authors" => Ok(Self::Author),
            _ => Err(TypeError::UnknownResourceType(s.to_string())),
        }
    }
}

/// Which kind of merge a set of sources participates in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMode {
    /// N-way reconciliation across catalog sources.
    Strategic,
    /// Base / ours / theirs reconciliation of one record.
    ThreeWay,
}

impl MergeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strategic => "strategic",
            Self::ThreeWay => "three_way",
        }
    }
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies the origin of a value.
///
/// The first four variants are the catalog sources reconciled by the N-way
/// merger; the last three name the inputs of a three-way merge. The derived
/// ordering is declaration order and is what deterministic iteration over
/// source-keyed maps relies on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceName {
    /// The locally curated catalog.
    LocalCatalog,
    /// The aggregator, fetched over HTTP.
    ModelsDevHttp,
    /// The aggregator, read from a cloned dataset.
    ModelsDevGit,
    /// A provider's own API.
    ProviderApi,
    Base,
    Ours,
    Theirs,
}

impl SourceName {
    /// Catalog sources in their default fallback priority.
    pub const STRATEGIC: [SourceName; 4] = [
        Self::LocalCatalog,
        Self::ModelsDevHttp,
        Self::ModelsDevGit,
        Self::ProviderApi,
    ];

    /// Three-way inputs in their default fallback priority.
    pub const THREE_WAY: [SourceName; 3] = [Self::Ours, Self::Theirs, Self::Base];

    /// The two aggregator sources, HTTP first.
    pub const AGGREGATORS: [SourceName; 2] = [Self::ModelsDevHttp, Self::ModelsDevGit];

    /// Which merge mode this source participates in.
    pub fn mode(&self) -> MergeMode {
        match self {
            Self::Base | Self::Ours | Self::Theirs => MergeMode::ThreeWay,
            _ => MergeMode::Strategic,
        }
    }

    /// Returns `true` for the aggregator sources.
    pub fn is_aggregator(&self) -> bool {
        matches!(self, Self::ModelsDevHttp | Self::ModelsDevGit)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LocalCatalog => "local_catalog",
            Self::ModelsDevHttp => "models_dev_http",
            Self::ModelsDevGit => "models_dev_git",
            Self::ProviderApi => "provider_api",
            Self::Base => "base",
            Self::Ours => "ours",
            Self::Theirs => "theirs",
        }
    }
}

impl fmt::Display for SourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceName {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "local_catalog" | "local" => Ok(Self::LocalCatalog),
            "models_dev_http" => Ok(Self::ModelsDevHttp),
            "models_dev_git" => Ok(Self::ModelsDevGit),
            "provider_api" | "provider" => Ok(Self::ProviderApi),
            "base" => Ok(Self::Base),
            "ours" => Ok(Self::Ours),
            "theirs" => Ok(Self::Theirs),
            _ => Err(TypeError::UnknownSource(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_follows_declaration() {
        assert!(SourceName::LocalCatalog < SourceName::ModelsDevHttp);
        assert!(SourceName::ModelsDevGit < SourceName::ProviderApi);
        assert!(SourceName::Ours < SourceName::Theirs);
    }

    #[test]
    fn modes() {
        for source in SourceName::STRATEGIC {
            assert_eq!(source.mode(), MergeMode::Strategic);
        }
        for source in SourceName::THREE_WAY {
            assert_eq!(source.mode(), MergeMode::ThreeWay);
        }
    }

    #[test]
    fn parse_accepts_aliases() {
        assert_eq!("local".parse::<SourceName>().unwrap(), SourceName::LocalCatalog);
        assert_eq!(
            "models-dev-http".parse::<SourceName>().unwrap(),
            SourceName::ModelsDevHttp
        );
        assert_eq!("Providers".parse::<ResourceType>().unwrap(), ResourceType::Provider);
        assert!("upstream".parse::<SourceName>().is_err());
    }

    #[test]
    fn display_matches_serde() {
        for source in SourceName::STRATEGIC.iter().chain(SourceName::THREE_WAY.iter()) {
            let json = serde_json::to_string(source).unwrap();
            assert_eq!(json, format!("\"{source}\""));
        }
        let json = serde_json::to_string(&ResourceType::Author).unwrap();
        assert_eq!(json, "\"author\"");
        for mode in [MergeMode::Strategic, MergeMode::ThreeWay] {
            assert_eq!(serde_json::to_string(&mode).unwrap(), format!("\"{mode}\""));
        }
    }
}
