use starmap_types::{ResourceType, SourceName};

use crate::error::ProvenanceError;
use crate::map::ProvenanceMap;
use crate::records::{FieldProvenance, ProvenanceInfo, ProvenanceKey};

/// Write boundary for a long-lived provenance ledger.
pub trait ProvenanceWriter: Send + Sync {
    /// Make `info` current for `key`, pushing the prior current (if any)
    /// onto the history.
    fn track(&self, key: ProvenanceKey, info: ProvenanceInfo) -> Result<(), ProvenanceError>;

    /// Fold the provenance returned by a merge into the ledger, tracking
    /// only fields whose winning source or value changed. Returns the number
    /// of fields tracked.
    fn absorb(&self, merged: &ProvenanceMap) -> Result<usize, ProvenanceError>;
}

/// Read boundary for a provenance ledger. All results are copies.
pub trait ProvenanceReader: Send + Sync {
    fn get(&self, key: &ProvenanceKey) -> Result<Option<FieldProvenance>, ProvenanceError>;

    /// Every recorded winner for `key`, oldest first, current last.
    fn history(&self, key: &ProvenanceKey) -> Result<Vec<ProvenanceInfo>, ProvenanceError>;

    fn for_resource(
        &self,
        resource_type: ResourceType,
        resource_id: &str,
    ) -> Result<Vec<(ProvenanceKey, FieldProvenance)>, ProvenanceError>;

    fn won_by(&self, source: SourceName) -> Result<Vec<ProvenanceKey>, ProvenanceError>;

    fn snapshot(&self) -> Result<ProvenanceMap, ProvenanceError>;

    fn field_count(&self) -> Result<usize, ProvenanceError>;
}
