use serde::{Deserialize, Serialize};

use crate::author::Author;
use crate::model::Model;
use crate::provider::Provider;
use crate::source::ResourceType;

/// A catalog record of any kind.
///
/// Used where the kind is only known at runtime, e.g. records read from a
/// file; a three-way merge over mixed kinds is a structural error.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "record", rename_all = "snake_case")]
pub enum Resource {
    Model(Model),
    Provider(Provider),
    Author(Author),
}

impl Resource {
    pub fn resource_type(&self) -> ResourceType {
        match self {
            Self::Model(_) => ResourceType::Model,
            Self::Provider(_) => ResourceType::Provider,
            Self::Author(_) => ResourceType::Author,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Model(m) => &m.id,
            Self::Provider(p) => &p.id,
            Self::Author(a) => &a.id,
        }
    }
}

impl From<Model> for Resource {
    fn from(model: Model) -> Self {
        Self::Model(model)
    }
}

impl From<Provider> for Resource {
    fn from(provider: Provider) -> Self {
        Self::Provider(provider)
    }
}

impl From<Author> for Resource {
    fn from(author: Author) -> Self {
        Self::Author(author)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tagged_serde() {
        let resource = Resource::from(Author::new("meta", "Meta"));
        let json = serde_json::to_value(&resource).unwrap();
        assert_eq!(
            json,
            json!({ "type": "author", "record": { "id": "meta", "name": "Meta" } })
        );
        let parsed: Resource = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.resource_type(), ResourceType::Author);
        assert_eq!(parsed.id(), "meta");
    }
}
