//! Provenance ledger for Starmap.
//!
//! This crate records, for every `(resource type, resource id, field)` triple,
//! which source's value won, what the value was, and when. It provides:
//! - `ProvenanceInfo` / `FieldProvenance` records with per-field history
//! - `ProvenanceMap`, the plain value a merge call returns
//! - `ProvenanceWriter` / `ProvenanceReader` trait boundaries
//! - `InMemoryProvenance`, a lock-guarded long-lived ledger for callers

pub mod error;
pub mod map;
pub mod memory;
pub mod records;
pub mod traits;

pub use error::ProvenanceError;
pub use map::ProvenanceMap;
pub use memory::InMemoryProvenance;
pub use records::{FieldProvenance, ProvenanceInfo, ProvenanceKey};
pub use traits::{ProvenanceReader, ProvenanceWriter};
