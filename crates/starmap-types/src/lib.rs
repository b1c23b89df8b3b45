//! Foundation types for Starmap.
//!
//! This crate provides the catalog records reconciled by the merge engine and
//! the small vocabulary types every other Starmap crate shares.
//!
//! # Key Types
//!
//! - [`Model`] / [`Provider`] / [`Author`]: Catalog records with nested sub-structures
//! - [`Resource`]: A record of any of the three kinds
//! - [`ResourceType`]: Tag scoping authority lookups and provenance keys
//! - [`SourceName`]: Where a value came from (catalog, aggregator, provider API,
//!   or a three-way side)
//! - [`FieldPath`]: Dot-separated address of a field, stable across sources
//! - [`MergePolicy`]: How conflicting values of a field may be combined

pub mod author;
pub mod error;
pub mod model;
pub mod path;
pub mod policy;
pub mod provider;
pub mod resource;
pub mod source;

pub use author::Author;
pub use error::TypeError;
pub use model::{
    FloatRange, IntRange, Model, ModelFeatures, ModelGeneration, ModelLimits, ModelMetadata,
    ModelModalities, ModelModality, ModelPricing, ModelTokenPricing,
};
pub use path::FieldPath;
pub use policy::MergePolicy;
pub use provider::{Provider, ProviderApiKey, ProviderCatalog, ProviderPrivacyPolicy};
pub use resource::Resource;
pub use source::{MergeMode, ResourceType, SourceName};
