use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use starmap_types::{ResourceType, SourceName};

use crate::error::ProvenanceError;
use crate::map::ProvenanceMap;
use crate::records::{FieldProvenance, ProvenanceInfo, ProvenanceKey};
use crate::traits::{ProvenanceReader, ProvenanceWriter};

/// In-memory provenance ledger shared across sync runs.
///
/// The merge engine itself never touches this type; callers absorb each
/// merge's [`ProvenanceMap`] into it. Entries are never pruned here.
#[derive(Default)]
pub struct InMemoryProvenance {
    inner: RwLock<ProvenanceMap>,
}

impl InMemoryProvenance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a ledger from a previously persisted map.
    pub fn from_map(map: ProvenanceMap) -> Self {
        Self {
            inner: RwLock::new(map),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, ProvenanceMap>, ProvenanceError> {
        self.inner
            .read()
            .map_err(|_| ProvenanceError::LockPoisoned("read"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, ProvenanceMap>, ProvenanceError> {
        self.inner
            .write()
            .map_err(|_| ProvenanceError::LockPoisoned("write"))
    }
}

impl ProvenanceWriter for InMemoryProvenance {
    fn track(&self, key: ProvenanceKey, info: ProvenanceInfo) -> Result<(), ProvenanceError> {
        self.write()?.track(key, info);
        Ok(())
    }

    fn absorb(&self, merged: &ProvenanceMap) -> Result<usize, ProvenanceError> {
        let mut state = self.write()?;
        let mut tracked = 0;

        for (key, field) in merged.iter() {
            let unchanged = state
                .get(key)
                .is_some_and(|existing| existing.current.same_outcome(&field.current));
            if unchanged {
                continue;
            }
            state.track(key.clone(), field.current.clone());
            tracked += 1;
        }

        debug!(tracked, offered = merged.len(), "absorbed merge provenance");
        Ok(tracked)
    }
}

impl ProvenanceReader for InMemoryProvenance {
    fn get(&self, key: &ProvenanceKey) -> Result<Option<FieldProvenance>, ProvenanceError> {
        Ok(self.read()?.get(key).cloned())
    }

    fn history(&self, key: &ProvenanceKey) -> Result<Vec<ProvenanceInfo>, ProvenanceError> {
        Ok(self
            .read()?
            .get(key)
            .map(|field| {
                let mut versions = field.history.clone();
                versions.push(field.current.clone());
                versions
            })
            .unwrap_or_default())
    }

    fn for_resource(
        &self,
        resource_type: ResourceType,
        resource_id: &str,
    ) -> Result<Vec<(ProvenanceKey, FieldProvenance)>, ProvenanceError> {
        Ok(self
            .read()?
            .for_resource(resource_type, resource_id)
            .map(|(key, field)| (key.clone(), field.clone()))
            .collect())
    }

    fn won_by(&self, source: SourceName) -> Result<Vec<ProvenanceKey>, ProvenanceError> {
        Ok(self
            .read()?
            .won_by(source)
            .map(|(key, _)| key.clone())
            .collect())
    }

    fn snapshot(&self) -> Result<ProvenanceMap, ProvenanceError> {
        Ok(self.read()?.clone())
    }

    fn field_count(&self) -> Result<usize, ProvenanceError> {
        Ok(self.read()?.len())
    }
}
