//! Static field tables for each record type.
//!
//! Row order is the order in which merges visit fields and therefore the
//! order of any conflict list; keep related paths together.

use chrono::{DateTime, Utc};
use serde_json::Value;

use starmap_types::{Author, MergePolicy, Model, Provider, ResourceType};

use crate::access::{decode, encode, FieldSpec, ParentSpec, Record};

macro_rules! field {
    ($path:literal, $policy:ident, $name:ident) => {
        FieldSpec {
            path: $path,
            policy: MergePolicy::$policy,
            get: |r| encode(&r.$name),
            set: |r, v| {
                let value = decode(v)?;
                r.$name = value;
                Ok(())
            },
        }
    };
    ($path:literal, $policy:ident, $parent:ident . $($name:ident).+) => {
        FieldSpec {
            path: $path,
            policy: MergePolicy::$policy,
            get: |r| {
                r.$parent
                    .as_ref()
                    .map_or(Value::Null, |p| encode(&p.$($name).+))
            },
            set: |r, v| {
                let value = decode(v)?;
                r.$parent.get_or_insert_with(Default::default).$($name).+ = value;
                Ok(())
            },
        }
    };
}

macro_rules! parent {
    ($root:ident) => {
        ParentSpec {
            root: stringify!($root),
            present: |r| r.$root.is_some(),
            clear: |r| r.$root = None,
        }
    };
}

static MODEL_PARENTS: &[ParentSpec<Model>] =
    &[parent!(metadata), parent!(features), parent!(limits), parent!(pricing)];

static PROVIDER_PARENTS: &[ParentSpec<Provider>] = &[parent!(catalog), parent!(privacy_policy)];

static MODEL_FIELDS: &[FieldSpec<Model>] = &[
    field!("name", Manual, name),
    field!("description", Manual, description),
    field!("authors", SetUnion, authors),
    // metadata
    field!("metadata.release_date", Manual, metadata.release_date),
    field!("metadata.knowledge_cutoff", Manual, metadata.knowledge_cutoff),
    field!("metadata.open_weights", Manual, metadata.open_weights),
    field!("metadata.tags", SetUnion, metadata.tags),
    // features
    field!("features.modalities.input", SetUnion, features.modalities.input),
    field!("features.modalities.output", SetUnion, features.modalities.output),
    field!("features.tool_calls", BooleanOr, features.tool_calls),
    field!("features.tools", BooleanOr, features.tools),
    field!("features.tool_choice", BooleanOr, features.tool_choice),
    field!("features.web_search", BooleanOr, features.web_search),
    field!("features.attachments", BooleanOr, features.attachments),
    field!("features.reasoning", BooleanOr, features.reasoning),
    field!("features.reasoning_effort", BooleanOr, features.reasoning_effort),
    field!("features.reasoning_tokens", BooleanOr, features.reasoning_tokens),
    field!("features.include_reasoning", BooleanOr, features.include_reasoning),
    field!("features.temperature", BooleanOr, features.temperature),
    field!("features.top_p", BooleanOr, features.top_p),
    field!("features.top_k", BooleanOr, features.top_k),
    field!("features.frequency_penalty", BooleanOr, features.frequency_penalty),
    field!("features.presence_penalty", BooleanOr, features.presence_penalty),
    field!("features.max_tokens", BooleanOr, features.max_tokens),
    field!("features.stop", BooleanOr, features.stop),
    field!("features.seed", BooleanOr, features.seed),
    field!("features.logprobs", BooleanOr, features.logprobs),
    field!("features.format_response", BooleanOr, features.format_response),
    field!("features.structured_outputs", BooleanOr, features.structured_outputs),
    field!("features.streaming", BooleanOr, features.streaming),
    // generation controls are compared as one unit
    field!("generation", Manual, generation),
    // limits
    field!("limits.context_window", NumericMax, limits.context_window),
    field!("limits.output_tokens", NumericMax, limits.output_tokens),
    // pricing
    field!("pricing.tokens.input", Manual, pricing.tokens.input),
    field!("pricing.tokens.output", Manual, pricing.tokens.output),
    field!("pricing.tokens.reasoning", Manual, pricing.tokens.reasoning),
    field!("pricing.tokens.cache_read", Manual, pricing.tokens.cache_read),
    field!("pricing.tokens.cache_write", Manual, pricing.tokens.cache_write),
    field!("pricing.currency", Manual, pricing.currency),
];

static PROVIDER_FIELDS: &[FieldSpec<Provider>] = &[
    field!("name", Manual, name),
    field!("headquarters", Manual, headquarters),
    field!("icon_url", Manual, icon_url),
    field!("status_page_url", Manual, status_page_url),
    field!("api_key", Manual, api_key),
    field!("env_vars", SetUnion, env_vars),
    field!("catalog.docs_url", Manual, catalog.docs_url),
    field!("catalog.endpoint_url", Manual, catalog.endpoint_url),
    field!("catalog.authors", SetUnion, catalog.authors),
    field!("privacy_policy.privacy_policy_url", Manual, privacy_policy.privacy_policy_url),
    field!("privacy_policy.terms_of_service_url", Manual, privacy_policy.terms_of_service_url),
    field!("privacy_policy.retains_data", Manual, privacy_policy.retains_data),
    field!("privacy_policy.trains_on_data", Manual, privacy_policy.trains_on_data),
];

static AUTHOR_FIELDS: &[FieldSpec<Author>] = &[
    field!("name", Manual, name),
    field!("description", Manual, description),
    field!("aliases", SetUnion, aliases),
    field!("website", Manual, website),
    field!("github", Manual, github),
    field!("huggingface", Manual, huggingface),
    field!("twitter", Manual, twitter),
];

impl Record for Model {
    const RESOURCE_TYPE: ResourceType = ResourceType::Model;

    fn id(&self) -> &str {
        &self.id
    }

    fn with_id(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Default::default()
        }
    }

    fn fields() -> &'static [FieldSpec<Self>] {
        MODEL_FIELDS
    }

    fn parents() -> &'static [ParentSpec<Self>] {
        MODEL_PARENTS
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    fn set_timestamps(
        &mut self,
        created_at: Option<DateTime<Utc>>,
        updated_at: Option<DateTime<Utc>>,
    ) {
        self.created_at = created_at;
        self.updated_at = updated_at;
    }
}

impl Record for Provider {
    const RESOURCE_TYPE: ResourceType = ResourceType::Provider;

    fn id(&self) -> &str {
        &self.id
    }

    fn with_id(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Default::default()
        }
    }

    fn fields() -> &'static [FieldSpec<Self>] {
        PROVIDER_FIELDS
    }

    fn parents() -> &'static [ParentSpec<Self>] {
        PROVIDER_PARENTS
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    fn set_timestamps(
        &mut self,
        created_at: Option<DateTime<Utc>>,
        updated_at: Option<DateTime<Utc>>,
    ) {
        self.created_at = created_at;
        self.updated_at = updated_at;
    }
}

impl Record for Author {
    const RESOURCE_TYPE: ResourceType = ResourceType::Author;

    fn id(&self) -> &str {
        &self.id
    }

    fn with_id(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Default::default()
        }
    }

    fn fields() -> &'static [FieldSpec<Self>] {
        AUTHOR_FIELDS
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    fn set_timestamps(
        &mut self,
        created_at: Option<DateTime<Utc>>,
        updated_at: Option<DateTime<Utc>>,
    ) {
        self.created_at = created_at;
        self.updated_at = updated_at;
    }
}
