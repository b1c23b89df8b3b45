//! Merge engine for Starmap.
//!
//! Reconciles catalog records describing the same model, provider, or author
//! that arrive from several sources of differing trustworthiness, or as two
//! divergent edits of a common snapshot.
//!
//! - [`StrategicMerger`]: N-way merge across named sources using field-level
//!   authority rules and fixed composite rules for limits, pricing, metadata
//!   and capability flags. Emits merged records plus provenance.
//! - [`ThreeWayMerger`]: base / ours / theirs merge with conflict detection,
//!   classification, and auto-merge (numeric max, set union, boolean OR).
//! - [`resolve_conflicts`]: apply a blanket [`ConflictResolution`] to a
//!   conflict list.
//!
//! Every merge is a synchronous, side-effect-free transformation: inputs are
//! only read, outputs are freshly allocated, and iteration over source-keyed
//! data is always in a fixed order so identical inputs give identical output.

pub mod authority;
pub mod config;
pub mod error;
pub mod resolve;
pub mod strategic;
pub mod strategy;
pub mod three_way;

pub use authority::{Authority, AuthorityTable};
pub use config::{AuthorityRule, PolicyRule, PriorityRule, RulesConfig};
pub use error::{MergeError, MergeResult};
pub use resolve::{apply_resolutions, resolve_conflicts, ConflictResolution, Resolution};
pub use strategic::{StrategicMerger, StrategicOutcome};
pub use strategy::{AuthorityStrategy, ResolutionStrategy, Resolved};
pub use three_way::{Conflict, ConflictKind, ThreeWayMerger, ThreeWayOutcome};
