//! Model records and their nested sub-structures.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// An AI model as described by one source.
///
/// Every sub-structure is optional because sources differ in coverage: the
/// local catalog may only carry identity fields, the aggregator carries
/// pricing and limits, and a provider API reports live capabilities.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Model {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Author IDs.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ModelMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<ModelFeatures>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<ModelGeneration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limits: Option<ModelLimits>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pricing: Option<ModelPricing>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    /// A model with only its ID and display name set.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knowledge_cutoff: Option<NaiveDate>,
    pub open_weights: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Content kinds a model accepts or produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelModality {
    Text,
    Image,
    Audio,
    Video,
    Pdf,
    Embedding,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelModalities {
    pub input: Vec<ModelModality>,
    pub output: Vec<ModelModality>,
}

/// Capability flags.
///
/// Flags only ever turn on during reconciliation: a source that does not
/// know about a capability reports `false`, which must not clear a `true`
/// reported elsewhere.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelFeatures {
    pub modalities: ModelModalities,

    // Tools and attachments
    pub tool_calls: bool,
    pub tools: bool,
    pub tool_choice: bool,
    pub web_search: bool,
    pub attachments: bool,

    // Reasoning
    pub reasoning: bool,
    pub reasoning_effort: bool,
    pub reasoning_tokens: bool,
    pub include_reasoning: bool,

    // Sampling parameters
    pub temperature: bool,
    pub top_p: bool,
    pub top_k: bool,
    pub frequency_penalty: bool,
    pub presence_penalty: bool,
    pub max_tokens: bool,
    pub stop: bool,
    pub seed: bool,
    pub logprobs: bool,

    // Response delivery
    pub format_response: bool,
    pub structured_outputs: bool,
    pub streaming: bool,
}

/// Inclusive range with a default, for float-valued generation controls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FloatRange {
    pub min: f64,
    pub max: f64,
    pub default: f64,
}

/// Inclusive range with a default, for integer-valued generation controls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntRange {
    pub min: i64,
    pub max: i64,
    pub default: i64,
}

/// Accepted ranges for generation controls.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelGeneration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<FloatRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<FloatRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<IntRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<IntRange>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelLimits {
    pub context_window: i64,
    pub output_tokens: i64,
}

/// Per-million-token prices. `None` means the source does not publish it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelTokenPricing {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_read: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_write: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelPricing {
    pub tokens: ModelTokenPricing,
    pub currency: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn partial_json_fills_defaults() {
        let model: Model = serde_json::from_value(json!({
            "id": "gpt-4o",
            "name": "GPT-4o",
            "limits": { "context_window": 128000 }
        }))
        .unwrap();
        assert_eq!(model.id, "gpt-4o");
        assert_eq!(model.limits.unwrap().context_window, 128_000);
        assert_eq!(model.limits.unwrap().output_tokens, 0);
        assert!(model.features.is_none());
    }

    #[test]
    fn modalities_serialize_lowercase() {
        let modalities = ModelModalities {
            input: vec![ModelModality::Text, ModelModality::Pdf],
            output: vec![ModelModality::Text],
        };
        let json = serde_json::to_value(&modalities).unwrap();
        assert_eq!(json, json!({ "input": ["text", "pdf"], "output": ["text"] }));
    }

    #[test]
    fn empty_optionals_are_skipped() {
        let json = serde_json::to_value(Model::new("m", "M")).unwrap();
        assert_eq!(json, json!({ "id": "m", "name": "M" }));
    }
}
